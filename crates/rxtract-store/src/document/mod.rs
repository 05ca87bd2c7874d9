//! Prediction document persistence.

use std::sync::Arc;

use async_trait::async_trait;
use rxtract_core::{BoundingBox, DocumentStatus, PredictionDocument};

use crate::StorageResult;

mod firestore;
mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

/// Shared handle to any document store implementation.
pub type BoxedDocumentStore = Arc<dyn DocumentStore>;

/// Partial update applied to a prediction document once recognition has
/// run. Lists are replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub texts: Option<Vec<String>>,
    pub confidences: Option<Vec<f32>>,
    pub boxes: Option<Vec<BoundingBox>>,
    pub status: Option<DocumentStatus>,
}

impl DocumentUpdate {
    /// An update that only moves the document to a new status.
    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// A full recognition result, carrying every list and the terminal
    /// status together.
    pub fn completed(
        texts: Vec<String>,
        confidences: Vec<f32>,
        boxes: Vec<BoundingBox>,
    ) -> Self {
        Self {
            texts: Some(texts),
            confidences: Some(confidences),
            boxes: Some(boxes),
            status: Some(DocumentStatus::Complete),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_none()
            && self.confidences.is_none()
            && self.boxes.is_none()
            && self.status.is_none()
    }
}

/// Storage for prediction documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists a new document and returns its generated identifier.
    async fn create(&self, document: &PredictionDocument) -> StorageResult<String>;

    /// Applies a partial update to an existing document.
    async fn update(&self, id: &str, update: DocumentUpdate) -> StorageResult<()>;

    /// Fetches a document by identifier.
    async fn fetch(&self, id: &str) -> StorageResult<PredictionDocument>;
}
