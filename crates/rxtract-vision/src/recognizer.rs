//! Handwritten-text recognition client.

use reqwest::Client as HttpClient;
use serde::Deserialize;

use rxtract_core::{Crop, RecognizeProvider};

use crate::detector::{build_http_client, read_envelope};
use crate::{Error, InferenceConfig, Result, TRACING_TARGET_RECOGNIZER};

/// HTTP client for the sequence-to-sequence OCR model server.
///
/// One call transcribes one crop. The client is stateless per call and, by
/// contract, performs no retry: a failed call is reported as-is and the
/// caller decides what a partial run means.
#[derive(Debug, Clone)]
pub struct RecognizerClient {
    http_client: HttpClient,
    config: InferenceConfig,
}

/// Payload of a successful recognition call.
#[derive(Debug, Deserialize)]
struct RecognizePayload {
    /// Best-effort transcription of the crop.
    text: String,
}

impl RecognizerClient {
    /// Creates a new recognition client.
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let http_client = build_http_client(&config)?;

        tracing::debug!(
            target: TRACING_TARGET_RECOGNIZER,
            base_url = %config.base_url(),
            "recognition client initialized"
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

    /// Transcribes a single crop.
    pub async fn recognize_crop(&self, crop: &Crop) -> Result<String> {
        let url = self.config.endpoint("v1/recognize")?;

        tracing::debug!(
            target: TRACING_TARGET_RECOGNIZER,
            url = %url,
            size = crop.png.len(),
            "sending crop to recognition endpoint"
        );

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(crop.png.to_vec())
                .file_name("crop.png")
                .mime_str("image/png")
                .map_err(|e| Error::invalid_config(format!("invalid crop MIME type: {e}")))?,
        );

        let mut request = self.http_client.post(url).multipart(form);
        if let Some(api_key) = self.config.api_key() {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let payload: RecognizePayload = read_envelope(response).await?;

        Ok(payload.text)
    }
}

#[async_trait::async_trait]
impl RecognizeProvider for RecognizerClient {
    async fn recognize(&self, crop: &Crop) -> rxtract_core::Result<String> {
        self.recognize_crop(crop).await.map_err(|e| {
            rxtract_core::Error::recognition()
                .with_message(e.to_string())
                .with_source(e)
        })
    }
}
