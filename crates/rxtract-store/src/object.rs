//! Object storage for uploaded images.

use jiff::Timestamp;
use opendal::Operator;
use uuid::Uuid;

use crate::config::{ObjectBackend, ObjectStoreConfig};
use crate::{StorageError, StorageResult, TRACING_TARGET_OBJECT};

/// A successfully uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Generated object name (without extension).
    pub name: String,
    /// Public URL of the object.
    pub url: String,
}

/// Durable storage for annotated prediction images, backed by an OpenDAL
/// operator.
#[derive(Clone)]
pub struct ImageStore {
    operator: Operator,
    config: ObjectStoreConfig,
}

impl ImageStore {
    /// Creates a new image store from configuration.
    pub fn new(config: ObjectStoreConfig) -> StorageResult<Self> {
        config.validate()?;
        let operator = Self::create_operator(&config)?;

        tracing::info!(
            target: TRACING_TARGET_OBJECT,
            backend = ?config.backend,
            bucket = %config.bucket,
            "image store initialized"
        );

        Ok(Self { operator, config })
    }

    /// Returns the configuration for this store.
    pub fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }

    /// Uploads a PNG image and returns its generated name and public URL.
    ///
    /// Object names are timestamped for operator-friendly listing, with a
    /// random tail so two requests in the same second cannot collide.
    pub async fn upload_image(&self, data: &[u8]) -> StorageResult<StoredImage> {
        let name = generate_name(Timestamp::now());
        let path = self.object_path(&name);

        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            path = %path,
            size = data.len(),
            "uploading image"
        );

        self.operator
            .write(&path, data.to_vec())
            .await
            .map_err(|e| StorageError::upload(e.to_string()))?;

        let url = self.public_url(&path);

        tracing::debug!(
            target: TRACING_TARGET_OBJECT,
            path = %path,
            url = %url,
            "image upload complete"
        );

        Ok(StoredImage { name, url })
    }

    /// Reads an object back; used by tests and local tooling.
    pub async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(name);
        Ok(self.operator.read(&path).await?.to_vec())
    }

    fn object_path(&self, name: &str) -> String {
        format!("{}/{}.png", self.config.prefix, name)
    }

    fn public_url(&self, path: &str) -> String {
        match &self.config.public_base_url {
            Some(base) => {
                // Url::join would eat the last path segment of the base.
                format!("{}/{}", base.as_str().trim_end_matches('/'), path)
            }
            None => format!(
                "https://storage.googleapis.com/{}/{}",
                self.config.bucket, path
            ),
        }
    }

    fn create_operator(config: &ObjectStoreConfig) -> StorageResult<Operator> {
        match config.backend {
            #[cfg(feature = "gcs")]
            ObjectBackend::Gcs => {
                let mut builder = opendal::services::Gcs::default().bucket(&config.bucket);

                if let Some(ref credential) = config.credential {
                    builder = builder.credential(credential);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(feature = "s3")]
            ObjectBackend::S3 => {
                let mut builder = opendal::services::S3::default().bucket(&config.bucket);

                if let Some(ref region) = config.region {
                    builder = builder.region(region);
                }

                if let Some(ref endpoint) = config.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StorageError::init(e.to_string()))
            }

            #[cfg(feature = "memory")]
            ObjectBackend::Memory => Operator::new(opendal::services::Memory::default())
                .map(|op| op.finish())
                .map_err(|e| StorageError::init(e.to_string())),
        }
    }
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore")
            .field("backend", &self.config.backend)
            .field("bucket", &self.config.bucket)
            .finish()
    }
}

/// Generates a `YYYYMMDD-HHMMSS-xxxxxxxx` object name.
fn generate_name(now: Timestamp) -> String {
    let stamp = now.strftime("%Y%m%d-%H%M%S");
    let tail = Uuid::new_v4().simple().to_string();
    format!("{}-{}", stamp, &tail[..8])
}
