//! In-memory document store for tests and local development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rxtract_core::PredictionDocument;
use uuid::Uuid;

use super::{DocumentStore, DocumentUpdate};
use crate::{StorageError, StorageResult};

/// Keeps documents in a process-local map. Drop it and everything is gone.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, PredictionDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn count(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, document: &PredictionDocument) -> StorageResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut guard = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(id.clone(), document.clone());
        Ok(id)
    }

    async fn update(&self, id: &str, update: DocumentUpdate) -> StorageResult<()> {
        let mut guard = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let document = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(id))?;

        if let Some(texts) = update.texts {
            document.texts = texts;
        }
        if let Some(confidences) = update.confidences {
            document.confidences = confidences;
        }
        if let Some(boxes) = update.boxes {
            document.boxes = boxes;
        }
        if let Some(status) = update.status {
            document.status = status;
        }
        Ok(())
    }

    async fn fetch(&self, id: &str) -> StorageResult<PredictionDocument> {
        let guard = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(id))
    }
}
