//! Application state and dependency injection.

use std::sync::Arc;

use rxtract_core::{BoxedDetector, BoxedRecognizer};
use rxtract_store::{BoxedDocumentStore, ImageStore};
use url::Url;

use crate::pipeline::RecognitionPipeline;
use crate::service::ServiceConfig;

/// Shared secret compared against the `x-api-key` header.
///
/// Wrapped so the secret never appears in debug output.
#[derive(Clone)]
pub struct ApiKeySecret(Arc<str>);

impl ApiKeySecret {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    /// Exact match against the configured secret.
    pub fn matches(&self, candidate: &str) -> bool {
        *self.0 == *candidate
    }
}

impl std::fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKeySecret(..)")
    }
}

/// Request-handling settings that are plain values rather than clients.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Where `GET /` points, when configured.
    pub redirect_url: Option<Url>,
    /// Minimum detection confidence on a 0.0 to 1.0 scale.
    pub detection_confidence: f32,
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    detector: BoxedDetector,
    image_store: ImageStore,
    document_store: BoxedDocumentStore,
    pipeline: RecognitionPipeline,

    api_key: ApiKeySecret,
    settings: RuntimeSettings,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Builds all inference and storage clients up front so a broken
    /// configuration fails the process at startup, not mid-request.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let recognizer: BoxedRecognizer = Arc::new(config.create_recognizer()?);
        let document_store = config.create_document_store()?;
        let pipeline = RecognitionPipeline::new(
            recognizer,
            document_store.clone(),
            config.pipeline_concurrency,
        );

        Ok(Self {
            detector: Arc::new(config.create_detector()?),
            image_store: config.create_image_store()?,
            document_store,
            pipeline,
            api_key: ApiKeySecret::new(config.api_key.as_str()),
            settings: RuntimeSettings {
                redirect_url: config.redirect_url.clone(),
                detection_confidence: config.detection_confidence,
            },
        })
    }

    /// Builds state around explicit providers and stores. Used by tests to
    /// inject mocks and by anything embedding the router.
    pub fn with_providers(
        detector: BoxedDetector,
        recognizer: BoxedRecognizer,
        image_store: ImageStore,
        document_store: BoxedDocumentStore,
        api_key: ApiKeySecret,
        settings: RuntimeSettings,
        pipeline_concurrency: usize,
    ) -> Self {
        let pipeline = RecognitionPipeline::new(
            recognizer,
            document_store.clone(),
            pipeline_concurrency,
        );

        Self {
            detector,
            image_store,
            document_store,
            pipeline,
            api_key,
            settings,
        }
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(detector: BoxedDetector);
impl_di!(image_store: ImageStore);
impl_di!(document_store: BoxedDocumentStore);
impl_di!(pipeline: RecognitionPipeline);
impl_di!(api_key: ApiKeySecret);
impl_di!(settings: RuntimeSettings);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_matches_exactly() {
        let secret = ApiKeySecret::new("s3cret");
        assert!(secret.matches("s3cret"));
        assert!(!secret.matches("s3cret "));
        assert!(!secret.matches(""));
    }

    #[test]
    fn api_key_debug_hides_secret() {
        let secret = ApiKeySecret::new("s3cret");
        assert_eq!(format!("{secret:?}"), "ApiKeySecret(..)");
    }
}
