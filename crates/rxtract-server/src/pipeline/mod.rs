//! Background recognition pipeline.
//!
//! Each accepted request submits one job; jobs run on the shared tokio
//! runtime behind a semaphore so a burst of uploads cannot spawn an
//! unbounded number of concurrent model calls.

use std::sync::Arc;

use rxtract_core::{BoundingBox, Crop, DocumentStatus};
use rxtract_store::{BoxedDocumentStore, DocumentUpdate};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use rxtract_core::BoxedRecognizer;

/// Tracing target for pipeline operations.
const TRACING_TARGET: &str = "rxtract_server::pipeline";

/// One request's worth of background work.
///
/// Crops and confidences are index-aligned with the boxes returned in the
/// synchronous response.
#[derive(Debug)]
pub struct RecognitionJob {
    pub document_id: String,
    pub crops: Vec<Crop>,
    pub confidences: Vec<f32>,
}

/// Runs recognition jobs with bounded concurrency and persists their
/// progress to the document store.
#[derive(Clone)]
pub struct RecognitionPipeline {
    recognizer: BoxedRecognizer,
    documents: BoxedDocumentStore,
    semaphore: Arc<Semaphore>,
}

impl RecognitionPipeline {
    pub fn new(
        recognizer: BoxedRecognizer,
        documents: BoxedDocumentStore,
        concurrency: usize,
    ) -> Self {
        Self {
            recognizer,
            documents,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Submits a job and returns its handle.
    ///
    /// The handle can be awaited for completion but dropping it does not
    /// cancel the job.
    pub fn submit(&self, job: RecognitionJob) -> JoinHandle<()> {
        let pipeline = self.clone();

        tokio::spawn(async move {
            let permit = pipeline.semaphore.clone().acquire_owned().await;
            if permit.is_err() {
                // Semaphore is never closed while the pipeline is alive.
                tracing::error!(
                    target: TRACING_TARGET,
                    document_id = %job.document_id,
                    "pipeline semaphore closed, dropping job"
                );
                return;
            }

            let document_id = job.document_id.clone();
            if let Err(error) = pipeline.run(job).await {
                tracing::error!(
                    target: TRACING_TARGET,
                    document_id = %document_id,
                    %error,
                    "recognition job failed"
                );
                pipeline.mark_failed(&document_id).await;
            }
        })
    }

    /// Recognizes every crop in order, re-persisting the accumulated lists
    /// after each step so readers observe aligned prefixes.
    async fn run(&self, job: RecognitionJob) -> anyhow::Result<()> {
        let total = job.crops.len();
        let boxes: Vec<BoundingBox> = job.crops.iter().map(|c| c.bbox).collect();
        let mut texts: Vec<String> = Vec::with_capacity(total);

        tracing::debug!(
            target: TRACING_TARGET,
            document_id = %job.document_id,
            crops = total,
            "recognition job started"
        );

        if total == 0 {
            self.documents
                .update(
                    &job.document_id,
                    DocumentUpdate::status(DocumentStatus::Complete),
                )
                .await?;
            return Ok(());
        }

        for (index, crop) in job.crops.iter().enumerate() {
            let text = self.recognizer.recognize(crop).await?;
            texts.push(text);

            let done = index + 1;
            let update = if done == total {
                DocumentUpdate::completed(texts.clone(), job.confidences.clone(), boxes.clone())
            } else {
                DocumentUpdate {
                    texts: Some(texts.clone()),
                    confidences: Some(job.confidences[..done].to_vec()),
                    boxes: Some(boxes[..done].to_vec()),
                    status: Some(DocumentStatus::Processing),
                }
            };

            self.documents.update(&job.document_id, update).await?;
        }

        tracing::info!(
            target: TRACING_TARGET,
            document_id = %job.document_id,
            crops = total,
            "recognition job complete"
        );

        Ok(())
    }

    /// Best effort; the original failure is already logged.
    async fn mark_failed(&self, document_id: &str) {
        let update = DocumentUpdate::status(DocumentStatus::Failed);
        if let Err(error) = self.documents.update(document_id, update).await {
            tracing::error!(
                target: TRACING_TARGET,
                document_id = %document_id,
                %error,
                "failed to mark document as failed"
            );
        }
    }
}

impl std::fmt::Debug for RecognitionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionPipeline")
            .field("available_permits", &self.semaphore.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use rxtract_core::mock::MockRecognizer;
    use rxtract_core::{BoundingBox, PredictionDocument};
    use rxtract_store::{DocumentStore, MemoryStore};

    use super::*;

    fn crop(i: f32) -> Crop {
        Crop::new(Bytes::from_static(b"png"), BoundingBox::new(i, i, i + 1.0, i + 1.0))
    }

    async fn create_pending(store: &MemoryStore) -> String {
        store
            .create(&PredictionDocument::new("img", "https://cdn/img.png"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn completes_and_aligns_lists() {
        let store = Arc::new(MemoryStore::new());
        let recognizer = Arc::new(MockRecognizer::with_texts(vec![
            "amoxicillin".into(),
            "500mg".into(),
        ]));
        let pipeline = RecognitionPipeline::new(recognizer, store.clone(), 2);

        let id = create_pending(&store).await;
        pipeline
            .submit(RecognitionJob {
                document_id: id.clone(),
                crops: vec![crop(0.0), crop(1.0)],
                confidences: vec![90.0, 80.0],
            })
            .await
            .unwrap();

        let doc = store.fetch(&id).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Complete);
        assert_eq!(doc.texts, vec!["amoxicillin", "500mg"]);
        assert_eq!(doc.confidences, vec![90.0, 80.0]);
        assert_eq!(doc.boxes.len(), 2);
        assert!(doc.lists_aligned());
    }

    #[tokio::test]
    async fn empty_job_goes_straight_to_complete() {
        let store = Arc::new(MemoryStore::new());
        let recognizer = Arc::new(MockRecognizer::with_texts(vec![]));
        let pipeline = RecognitionPipeline::new(recognizer, store.clone(), 1);

        let id = create_pending(&store).await;
        pipeline
            .submit(RecognitionJob {
                document_id: id.clone(),
                crops: vec![],
                confidences: vec![],
            })
            .await
            .unwrap();

        let doc = store.fetch(&id).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Complete);
        assert!(doc.texts.is_empty());
    }

    #[tokio::test]
    async fn recognition_failure_marks_document_failed() {
        let store = Arc::new(MemoryStore::new());
        let recognizer = Arc::new(
            MockRecognizer::with_texts(vec!["first".into(), "second".into()]).failing_at(1),
        );
        let pipeline = RecognitionPipeline::new(recognizer, store.clone(), 1);

        let id = create_pending(&store).await;
        pipeline
            .submit(RecognitionJob {
                document_id: id.clone(),
                crops: vec![crop(0.0), crop(1.0)],
                confidences: vec![90.0, 80.0],
            })
            .await
            .unwrap();

        let doc = store.fetch(&id).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        // Results recognized before the failure stay persisted.
        assert_eq!(doc.texts, vec!["first"]);
        assert!(doc.lists_aligned());
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let store = Arc::new(MemoryStore::new());
        let recognizer = Arc::new(MockRecognizer::with_texts(vec!["t".into()]));
        let pipeline = RecognitionPipeline::new(recognizer, store.clone(), 1);
        assert_eq!(pipeline.semaphore.available_permits(), 1);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let id = create_pending(&store).await;
            handles.push(pipeline.submit(RecognitionJob {
                document_id: id,
                crops: vec![crop(0.0)],
                confidences: vec![50.0],
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(pipeline.semaphore.available_permits(), 1);
        assert_eq!(store.count(), 4);
    }
}
