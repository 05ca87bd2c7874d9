//! Response DTOs for the HTTP surface.

use rxtract_core::{DocumentStatus, PredictionDocument};
use serde::{Deserialize, Serialize};

/// Synchronous response of `POST /detect_img`.
///
/// Recognized text is never present here; it converges on the persisted
/// document addressed by `documentID`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(rename = "documentID")]
    pub document_id: Option<String>,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    /// Region rectangles as `[x1, y1, x2, y2]`, index-aligned with
    /// `confidences`.
    pub boxes: Option<Vec<[f32; 4]>>,
    /// Detection confidences on a 0 to 100 scale.
    pub confidences: Option<Vec<f32>>,
    /// Set exactly when the request failed; all other fields are null.
    pub error: Option<String>,
}

impl DetectResponse {
    /// A successful detection envelope.
    pub fn success(
        document_id: String,
        image_url: String,
        boxes: Vec<[f32; 4]>,
        confidences: Vec<f32>,
    ) -> Self {
        Self {
            document_id: Some(document_id),
            image_url: Some(image_url),
            boxes: Some(boxes),
            confidences: Some(confidences),
            error: None,
        }
    }

    /// A failure envelope carrying only the error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Read-back view of a prediction document, `GET /documents/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResponse {
    #[serde(rename = "imageName")]
    pub image_name: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    pub texts: Vec<String>,
    pub confidences: Vec<f32>,
    pub boxes: Vec<[f32; 4]>,
    pub status: DocumentStatus,
    #[serde(rename = "createdAt")]
    pub created_at: jiff::Timestamp,
}

impl From<PredictionDocument> for DocumentResponse {
    fn from(doc: PredictionDocument) -> Self {
        Self {
            image_name: doc.image_name,
            image_url: doc.image_url,
            texts: doc.texts,
            confidences: doc.confidences,
            boxes: doc.boxes.iter().map(|b| b.to_array()).collect(),
            status: doc.status,
            created_at: doc.created_at,
        }
    }
}
