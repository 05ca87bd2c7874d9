//! Environment-driven service configuration.

use anyhow::{Context, anyhow};
use clap::Args;
use rxtract_store::{
    FirestoreStore, GcpCredentials, ImageStore, MemoryStore, ObjectBackend, ObjectStoreConfig,
};
use rxtract_vision::{DetectorClient, InferenceConfig, RecognizerClient};
use serde::{Deserialize, Serialize};
use url::Url;

/// App [`state`] configuration.
///
/// Every field can be provided through the environment, matching the
/// deployment surface of the service.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Shared secret required in the `x-api-key` header.
    #[arg(long, env = "API_KEY")]
    pub api_key: String,

    /// Where `GET /` redirects; a plain landing page is served when unset.
    #[arg(long, env = "REDIRECT_URL")]
    pub redirect_url: Option<Url>,

    /// Detection endpoint base URL.
    #[arg(long, env = "DETECTOR_URL")]
    pub detector_url: Url,

    /// Recognition endpoint base URL.
    #[arg(long, env = "RECOGNIZER_URL")]
    pub recognizer_url: Url,

    /// Minimum detection confidence, on a 0.0 to 1.0 scale.
    #[arg(long, env = "DETECTION_CONFIDENCE", default_value_t = 0.5)]
    pub detection_confidence: f32,

    /// Base64-encoded Google service-account JSON key.
    ///
    /// When unset the service falls back to in-memory storage, which is
    /// only useful for local development.
    #[arg(long, env = "GCP_CREDENTIALS")]
    pub gcp_credentials: Option<String>,

    /// Bucket for uploaded annotated images.
    #[arg(long, env = "STORAGE_BUCKET")]
    pub storage_bucket: Option<String>,

    /// Firestore documents endpoint override, mainly for the emulator.
    #[arg(long, env = "DOCUMENT_DATABASE_URL")]
    pub document_database_url: Option<Url>,

    /// Maximum number of concurrently running recognition jobs.
    #[arg(long, env = "PIPELINE_CONCURRENCY", default_value_t = 4)]
    pub pipeline_concurrency: usize,
}

impl ServiceConfig {
    /// Validates all configuration values and returns errors for invalid
    /// settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow!("API key cannot be empty"));
        }

        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(anyhow!(
                "detection confidence must be between 0.0 and 1.0, got {}",
                self.detection_confidence
            ));
        }

        if self.pipeline_concurrency == 0 {
            return Err(anyhow!("pipeline concurrency must be at least 1"));
        }

        if self.storage_bucket.is_some() && self.gcp_credentials.is_none() {
            return Err(anyhow!(
                "STORAGE_BUCKET requires GCP_CREDENTIALS to be set"
            ));
        }

        Ok(())
    }

    /// Creates the detection inference client.
    pub fn create_detector(&self) -> anyhow::Result<DetectorClient> {
        let config = InferenceConfig::new(self.detector_url.as_str())
            .context("invalid detection endpoint")?;
        DetectorClient::new(config).context("failed to create detection client")
    }

    /// Creates the recognition inference client.
    pub fn create_recognizer(&self) -> anyhow::Result<RecognizerClient> {
        let config = InferenceConfig::new(self.recognizer_url.as_str())
            .context("invalid recognition endpoint")?;
        RecognizerClient::new(config).context("failed to create recognition client")
    }

    /// Creates the annotated-image object store.
    pub fn create_image_store(&self) -> anyhow::Result<ImageStore> {
        let config = match (&self.storage_bucket, &self.gcp_credentials) {
            (Some(bucket), Some(credential)) => {
                ObjectStoreConfig::new(ObjectBackend::Gcs, bucket).with_credential(credential)
            }
            _ => {
                tracing::warn!("no storage bucket configured, using in-memory object store");
                ObjectStoreConfig::memory()
            }
        };

        ImageStore::new(config).context("failed to create image store")
    }

    /// Creates the prediction document store.
    pub fn create_document_store(&self) -> anyhow::Result<rxtract_store::BoxedDocumentStore> {
        match &self.gcp_credentials {
            Some(encoded) => {
                let credentials = GcpCredentials::from_base64(encoded)
                    .context("failed to parse GCP credentials")?;
                let store = match &self.document_database_url {
                    Some(url) => FirestoreStore::with_documents_url(credentials, url.clone()),
                    None => FirestoreStore::new(credentials),
                }
                .context("failed to create document store")?;
                Ok(std::sync::Arc::new(store))
            }
            None => {
                tracing::warn!("no GCP credentials configured, using in-memory document store");
                Ok(std::sync::Arc::new(MemoryStore::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> ServiceConfig {
        ServiceConfig {
            api_key: "secret".to_owned(),
            redirect_url: None,
            detector_url: "http://localhost:8601".parse().unwrap(),
            recognizer_url: "http://localhost:8602".parse().unwrap(),
            detection_confidence: 0.5,
            gcp_credentials: None,
            storage_bucket: None,
            document_database_url: None,
            pipeline_concurrency: 4,
        }
    }

    #[test]
    fn sample_config_is_valid() {
        sample_config().validate().unwrap();
    }

    #[test]
    fn rejects_empty_api_key() {
        let mut config = sample_config();
        config.api_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let mut config = sample_config();
        config.detection_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = sample_config();
        config.pipeline_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bucket_requires_credentials() {
        let mut config = sample_config();
        config.storage_bucket = Some("bucket".to_owned());
        assert!(config.validate().is_err());
    }

}
