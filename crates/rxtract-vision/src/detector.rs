//! Text-region detection client.

use reqwest::{Client as HttpClient, ClientBuilder};
use serde::Deserialize;

use rxtract_core::{BoundingBox, DetectProvider, Detections, Region};

use crate::image_ops;
use crate::{Error, InferenceConfig, Result, TRACING_TARGET_DETECTOR};

/// HTTP client for the text-detection model server.
///
/// Detection is fully delegated: the encoded image is POSTed to the serving
/// endpoint, which answers with bounding boxes and per-box confidences. The
/// annotated visualization is rendered locally from that answer.
#[derive(Debug, Clone)]
pub struct DetectorClient {
    http_client: HttpClient,
    config: InferenceConfig,
}

/// Payload of a successful detection call.
#[derive(Debug, Deserialize)]
struct DetectPayload {
    /// Boxes in xyxy pixel coordinates, model output order.
    boxes: Vec<[f32; 4]>,
    /// Confidences on the 0.0-1.0 scale, parallel to `boxes`.
    confidences: Vec<f32>,
}

/// Generic envelope the model servers wrap their payloads in.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl DetectorClient {
    /// Creates a new detection client.
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let http_client = build_http_client(&config)?;

        tracing::debug!(
            target: TRACING_TARGET_DETECTOR,
            base_url = %config.base_url(),
            "detection client initialized"
        );

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Runs one detection pass and returns regions above `threshold`
    /// (0.0-1.0), with confidences rescaled to 0-100.
    pub async fn detect_regions(&self, image: &[u8], threshold: f32) -> Result<Vec<Region>> {
        let url = self.config.endpoint("v1/detect")?;

        tracing::debug!(
            target: TRACING_TARGET_DETECTOR,
            url = %url,
            size = image.len(),
            threshold,
            "sending image to detection endpoint"
        );

        let form = reqwest::multipart::Form::new()
            .text("confidence", threshold.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(image.to_vec()).file_name("image"),
            );

        let mut request = self.http_client.post(url).multipart(form);
        if let Some(api_key) = self.config.api_key() {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let payload: DetectPayload = read_envelope(response).await?;

        if payload.boxes.len() != payload.confidences.len() {
            return Err(Error::invalid_response(format!(
                "box/confidence length mismatch: {} vs {}",
                payload.boxes.len(),
                payload.confidences.len()
            )));
        }

        let min_confidence = threshold;
        let regions = payload
            .boxes
            .into_iter()
            .zip(payload.confidences)
            .filter(|(_, conf)| *conf >= min_confidence)
            .map(|(bbox, conf)| Region::new(conf * 100.0, BoundingBox::from(bbox)))
            .collect::<Vec<_>>();

        tracing::debug!(
            target: TRACING_TARGET_DETECTOR,
            regions = regions.len(),
            "detection pass complete"
        );

        Ok(regions)
    }
}

#[async_trait::async_trait]
impl DetectProvider for DetectorClient {
    async fn detect(&self, image: &[u8], threshold: f32) -> rxtract_core::Result<Detections> {
        let decoded = image_ops::decode_image(image)
            .map_err(|e| rxtract_core::Error::invalid_image().with_message(e.to_string()))?;

        let regions = self
            .detect_regions(image, threshold)
            .await
            .map_err(into_detection_error)?;

        let annotated = image_ops::annotate(&decoded, &regions).map_err(into_detection_error)?;

        Ok(Detections::new(regions, annotated))
    }
}

fn into_detection_error(error: Error) -> rxtract_core::Error {
    rxtract_core::Error::detection()
        .with_message(error.to_string())
        .with_source(error)
}

/// Builds the shared reqwest client from an [`InferenceConfig`].
pub(crate) fn build_http_client(config: &InferenceConfig) -> Result<HttpClient> {
    Ok(ClientBuilder::new()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .user_agent(config.user_agent())
        .build()?)
}

/// Unwraps the `{success, data, message}` envelope, translating transport
/// and API failures into typed errors.
pub(crate) async fn read_envelope<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(Error::api(status.as_u16(), message));
    }

    let envelope: ApiEnvelope<T> = response
        .json()
        .await
        .map_err(|e| Error::invalid_response(format!("undecodable envelope: {e}")))?;

    if !envelope.success {
        return Err(Error::api(
            status.as_u16(),
            envelope
                .message
                .unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    envelope
        .data
        .ok_or_else(|| Error::invalid_response("success envelope without data"))
}
