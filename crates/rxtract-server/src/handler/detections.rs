//! Synchronous detection handler for `POST /detect_img`.

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use rxtract_core::{BoxedDetector, PredictionDocument};
use rxtract_store::{BoxedDocumentStore, ImageStore};
use rxtract_vision::image_ops;

use super::response::DetectResponse;
use super::{Error, ErrorKind, Result};
use crate::pipeline::{RecognitionJob, RecognitionPipeline};
use crate::service::{RuntimeSettings, ServiceState};

/// Tracing target for detection requests.
const TRACING_TARGET: &str = "rxtract_server::handler::detections";

/// Upload cap; prescription photos are a few megabytes at most.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Accepts a multipart image upload, detects handwritten regions, persists
/// the annotated image and a pending document, then hands the crops to the
/// background pipeline.
///
/// Returns boxes and confidences synchronously; recognized text only ever
/// appears on the persisted document.
#[tracing::instrument(skip_all)]
async fn detect_image(
    State(detector): State<BoxedDetector>,
    State(image_store): State<ImageStore>,
    State(document_store): State<BoxedDocumentStore>,
    State(pipeline): State<RecognitionPipeline>,
    State(settings): State<RuntimeSettings>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>> {
    let payload = read_file_field(multipart).await?;

    // The one failure that is the client's fault: bytes that are not an
    // image. Everything after this maps to 500.
    let decoded = image_ops::decode_image(&payload)
        .map_err(|_| ErrorKind::InvalidMediaType.into_error())?;

    let detections = detector
        .detect(&payload, settings.detection_confidence)
        .await
        .map_err(|e| ErrorKind::Internal.with_message(e.to_string()))?;

    tracing::debug!(
        target: TRACING_TARGET,
        regions = detections.len(),
        threshold = settings.detection_confidence,
        "detection complete"
    );

    let boxes = detections.boxes();
    let crops = image_ops::crop_regions(&decoded, &boxes)
        .map_err(|e| ErrorKind::Internal.with_message(e.to_string()))?;

    let stored = image_store
        .upload_image(&detections.annotated_png)
        .await
        .map_err(Error::from)?;

    let document = PredictionDocument::new(stored.name.clone(), stored.url.clone());
    let document_id = document_store.create(&document).await.map_err(Error::from)?;

    let confidences = detections.confidences();
    pipeline.submit(RecognitionJob {
        document_id: document_id.clone(),
        crops,
        confidences: confidences.clone(),
    });

    tracing::info!(
        target: TRACING_TARGET,
        document_id = %document_id,
        image = %stored.name,
        regions = boxes.len(),
        "detection request accepted"
    );

    Ok(Json(DetectResponse::success(
        document_id,
        stored.url,
        boxes.iter().map(|b| b.to_array()).collect(),
        confidences,
    )))
}

/// Pulls the raw bytes of the `file` multipart field.
async fn read_file_field(mut multipart: Multipart) -> Result<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ErrorKind::InvalidMediaType.into_error())?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|_| ErrorKind::InvalidMediaType.into_error());
        }
    }

    Err(ErrorKind::InvalidMediaType.with_message("missing file field"))
}

/// Returns a [`Router`] with the detection route.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/detect_img", post(detect_image))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use rxtract_core::mock::{FailingDetector, MockDetector, MockRecognizer};
    use rxtract_core::{BoundingBox, Crop, DocumentStatus, Region};
    use tokio::sync::Semaphore;

    use super::super::test::{
        TEST_API_KEY, create_test_server, sample_png, wait_until_terminal,
    };
    use super::*;
    use crate::middleware::API_KEY_HEADER;

    /// Recognizer that blocks until the test releases permits on the gate.
    struct GatedRecognizer(Arc<Semaphore>);

    #[async_trait::async_trait]
    impl rxtract_core::RecognizeProvider for GatedRecognizer {
        async fn recognize(&self, _crop: &Crop) -> rxtract_core::Result<String> {
            let permit = self
                .0
                .acquire()
                .await
                .map_err(|e| rxtract_core::Error::recognition().with_source(e))?;
            permit.forget();
            Ok("unblocked".into())
        }
    }

    fn two_regions() -> Vec<Region> {
        vec![
            Region::new(95.0, BoundingBox::new(4.0, 4.0, 20.0, 12.0)),
            Region::new(70.0, BoundingBox::new(4.0, 16.0, 28.0, 24.0)),
        ]
    }

    #[tokio::test]
    async fn returns_aligned_boxes_and_confidences() {
        let detector = Arc::new(MockDetector::with_regions(two_regions()));
        let recognizer = Arc::new(MockRecognizer::with_texts(vec!["rx".into()]));
        let (server, _store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;

        response.assert_status_ok();
        let body = response.json::<DetectResponse>();
        assert!(body.error.is_none());
        assert!(body.document_id.is_some());

        let boxes = body.boxes.unwrap();
        let confidences = body.confidences.unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(confidences.len(), 2);
        assert_eq!(boxes[0], [4.0, 4.0, 20.0, 12.0]);
        assert_eq!(confidences[0], 95.0);
    }

    #[tokio::test]
    async fn background_job_converges_on_complete() {
        let detector = Arc::new(MockDetector::with_regions(two_regions()));
        let recognizer = Arc::new(MockRecognizer::with_texts(vec![
            "amoxicillin".into(),
            "500mg".into(),
        ]));
        let (server, store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;

        response.assert_status_ok();
        let body = response.json::<DetectResponse>();
        let id = body.document_id.unwrap();

        let doc = wait_until_terminal(&store, &id).await;
        assert_eq!(doc.status, DocumentStatus::Complete);
        assert_eq!(doc.texts, vec!["amoxicillin", "500mg"]);
        assert_eq!(doc.confidences, body.confidences.unwrap());
        assert_eq!(doc.boxes.len(), 2);
        assert!(doc.lists_aligned());
    }

    #[tokio::test]
    async fn created_document_has_no_text() {
        let detector = Arc::new(MockDetector::with_regions(two_regions()));
        let gate = Arc::new(Semaphore::new(0));
        let recognizer = Arc::new(GatedRecognizer(gate.clone()));
        let (server, store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;

        response.assert_status_ok();
        let id = response.json::<DetectResponse>().document_id.unwrap();

        // The job is blocked on the gate, so the document is still exactly
        // what creation wrote.
        let doc = rxtract_store::DocumentStore::fetch(store.as_ref(), &id)
            .await
            .unwrap();
        assert!(doc.texts.is_empty());
        assert!(doc.confidences.is_empty());
        assert_eq!(doc.status, DocumentStatus::Pending);

        gate.add_permits(2);
        let doc = wait_until_terminal(&store, &id).await;
        assert_eq!(doc.status, DocumentStatus::Complete);
    }

    #[tokio::test]
    async fn storage_failure_is_500_with_no_background_job() {
        let detector = Arc::new(MockDetector::with_regions(two_regions()));
        let recognizer = Arc::new(MockRecognizer::with_texts(vec!["never".into()]));
        let server = super::super::test::create_test_server_with_document_store(
            detector,
            recognizer.clone(),
            Arc::new(super::super::test::FailingDocumentStore),
        )
        .await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.json::<DetectResponse>().error.is_some());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(recognizer.calls(), 0);
    }

    #[tokio::test]
    async fn undecodable_payload_is_415_and_creates_nothing() {
        let detector = Arc::new(MockDetector::with_regions(two_regions()));
        let recognizer = Arc::new(MockRecognizer::with_texts(vec!["x".into()]));
        let (server, store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(b"definitely not an image".to_vec()),
                ),
            )
            .await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body = response.json::<DetectResponse>();
        assert!(body.error.is_some());
        assert!(body.document_id.is_none());
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn missing_file_field_is_415() {
        let detector = Arc::new(MockDetector::with_regions(vec![]));
        let recognizer = Arc::new(MockRecognizer::with_texts(vec![]));
        let (server, _store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new()
                    .add_text("something_else", "value"),
            )
            .await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn detector_failure_is_500() {
        let detector = Arc::new(FailingDetector);
        let recognizer = Arc::new(MockRecognizer::with_texts(vec![]));
        let (server, store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn wrong_api_key_is_403_before_processing() {
        let detector = Arc::new(MockDetector::with_regions(two_regions()));
        let recognizer = Arc::new(MockRecognizer::with_texts(vec![]));
        let (server, store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, "wrong")
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(store.count(), 0);

        let response = server
            .post("/detect_img")
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn recognition_failure_leaves_failed_status() {
        let detector = Arc::new(MockDetector::with_regions(two_regions()));
        let recognizer = Arc::new(
            MockRecognizer::with_texts(vec!["first".into(), "second".into()]).failing_at(1),
        );
        let (server, store) = create_test_server(detector, recognizer).await;

        let response = server
            .post("/detect_img")
            .add_header(API_KEY_HEADER, TEST_API_KEY)
            .multipart(
                axum_test::multipart::MultipartForm::new().add_part(
                    "file",
                    axum_test::multipart::Part::bytes(sample_png().to_vec()),
                ),
            )
            .await;

        response.assert_status_ok();
        let id = response.json::<DetectResponse>().document_id.unwrap();

        let doc = wait_until_terminal(&store, &id).await;
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert_eq!(doc.texts, vec!["first"]);
    }
}
