//! Object-storage configuration.

use url::Url;

use crate::{StorageError, StorageResult};

/// Supported object-storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectBackend {
    /// Google Cloud Storage.
    #[cfg(feature = "gcs")]
    Gcs,
    /// S3-compatible storage.
    #[cfg(feature = "s3")]
    S3,
    /// In-memory storage for tests and local development.
    #[cfg(feature = "memory")]
    Memory,
}

/// Configuration for the [`ImageStore`].
///
/// [`ImageStore`]: crate::ImageStore
#[derive(Debug, Clone)]
#[must_use = "config does nothing unless you use it"]
pub struct ObjectStoreConfig {
    /// Which backend to build.
    pub backend: ObjectBackend,
    /// Bucket (or container) name.
    pub bucket: String,
    /// Key prefix under which uploads are placed.
    pub prefix: String,
    /// Base URL public object URLs are derived from. When unset, the GCS
    /// public URL scheme is used.
    pub public_base_url: Option<Url>,
    /// Base64-encoded service-account JSON for GCS.
    pub credential: Option<String>,
    /// Region for S3 backends.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible backends.
    pub endpoint: Option<String>,
}

impl ObjectStoreConfig {
    /// Creates a configuration for the given backend and bucket with the
    /// default `predictions/` prefix.
    pub fn new(backend: ObjectBackend, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            prefix: "predictions".to_string(),
            public_base_url: None,
            credential: None,
            region: None,
            endpoint: None,
        }
    }

    /// Creates an in-memory configuration for tests.
    #[cfg(feature = "memory")]
    pub fn memory() -> Self {
        Self::new(ObjectBackend::Memory, "memory")
    }

    /// Sets the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the base URL for public object URLs.
    pub fn with_public_base_url(mut self, url: Url) -> Self {
        self.public_base_url = Some(url);
        self
    }

    /// Sets the base64-encoded GCS service-account credential.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Validates the configuration for the selected backend.
    pub fn validate(&self) -> StorageResult<()> {
        if self.bucket.is_empty() {
            return Err(StorageError::init("bucket name cannot be empty"));
        }
        if self.prefix.starts_with('/') {
            return Err(StorageError::init("prefix must be relative"));
        }
        Ok(())
    }
}
