//! The persisted prediction document and its status state machine.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::geometry::BoundingBox;

/// Lifecycle of a prediction document.
///
/// `Pending -> Processing (1..N updates) -> Complete | Failed`.
///
/// The status field is the explicit terminal signal for the background phase:
/// without it readers could only infer completeness by comparing list
/// lengths, and a mid-run failure would be indistinguishable from slow
/// progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentStatus {
    /// Created with image metadata only; no recognition started.
    Pending,
    /// Background recognition is running; result lists may be shorter than
    /// the box list.
    Processing,
    /// All regions recognized and persisted.
    Complete,
    /// Recognition or persistence failed partway; result lists are frozen at
    /// their last consistent state.
    Failed,
}

/// The persisted record correlating one request's image, boxes, confidences
/// and recognized text.
///
/// Created with empty result lists at request time; the background job
/// overwrites `texts`, `confidences` and `boxes` wholesale on every update,
/// so the three lists are always index-aligned prefixes of the final result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionDocument {
    /// Generated object-storage name of the uploaded image.
    pub image_name: String,
    /// Public URL of the uploaded annotated image.
    pub image_url: String,
    /// Recognized text strings, one per processed region, in region order.
    pub texts: Vec<String>,
    /// Detection confidences (0-100), parallel to `texts` once complete.
    pub confidences: Vec<f32>,
    /// Bounding boxes, parallel to `confidences`.
    pub boxes: Vec<BoundingBox>,
    /// Current lifecycle state.
    pub status: DocumentStatus,
    /// Creation time of the document.
    pub created_at: Timestamp,
}

impl PredictionDocument {
    /// Creates a fresh document holding image metadata only.
    pub fn new(image_name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            image_url: image_url.into(),
            texts: Vec::new(),
            confidences: Vec::new(),
            boxes: Vec::new(),
            status: DocumentStatus::Pending,
            created_at: Timestamp::now(),
        }
    }

    /// Returns true when every region has a recognized text.
    ///
    /// Holds exactly when `status` is [`DocumentStatus::Complete`]; kept as a
    /// structural check so the invariant is testable independently of the
    /// status write.
    pub fn lists_aligned(&self) -> bool {
        self.texts.len() == self.confidences.len() && self.confidences.len() == self.boxes.len()
    }

    /// Returns true once the background phase has terminated, successfully
    /// or not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            DocumentStatus::Complete | DocumentStatus::Failed
        )
    }
}
