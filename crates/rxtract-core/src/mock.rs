//! Canned provider implementations for tests and local development.

use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;

use crate::detection::{Crop, Detections, Region};
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;
use crate::provider::{DetectProvider, RecognizeProvider};

/// A detector that returns a fixed region list for any input.
///
/// The annotated image is the input passed through unchanged.
#[derive(Debug, Clone, Default)]
pub struct MockDetector {
    regions: Vec<Region>,
}

impl MockDetector {
    /// Creates a detector that always reports the given regions.
    pub fn with_regions(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Creates a detector reporting `count` stacked 20x10 regions.
    pub fn with_region_count(count: usize) -> Self {
        let regions = (0..count)
            .map(|i| {
                let y = i as f32 * 12.0;
                Region::new(90.0 - i as f32, BoundingBox::new(1.0, y, 21.0, y + 10.0))
            })
            .collect();
        Self { regions }
    }
}

#[async_trait::async_trait]
impl DetectProvider for MockDetector {
    async fn detect(&self, image: &[u8], threshold: f32) -> Result<Detections> {
        let min_confidence = threshold * 100.0;
        let regions = self
            .regions
            .iter()
            .copied()
            .filter(|r| r.confidence >= min_confidence)
            .collect();
        Ok(Detections::new(regions, Bytes::copy_from_slice(image)))
    }
}

/// A detector that fails every call.
#[derive(Debug, Clone, Default)]
pub struct FailingDetector;

#[async_trait::async_trait]
impl DetectProvider for FailingDetector {
    async fn detect(&self, _image: &[u8], _threshold: f32) -> Result<Detections> {
        Err(Error::detection().with_message("mock detector failure"))
    }
}

/// A recognizer that cycles through a fixed list of transcriptions and
/// counts its calls.
///
/// With `fail_at` set, the call with that zero-based index returns a
/// recognition error, which exercises the pipeline's failed-terminal path.
#[derive(Debug, Default)]
pub struct MockRecognizer {
    texts: Vec<String>,
    fail_at: Option<usize>,
    calls: AtomicUsize,
}

impl MockRecognizer {
    /// Creates a recognizer cycling through the given transcriptions.
    pub fn with_texts(texts: Vec<String>) -> Self {
        Self {
            texts,
            fail_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Makes the call with the given index fail.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Number of recognition calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecognizeProvider for MockRecognizer {
    async fn recognize(&self, _crop: &Crop) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(call) {
            return Err(Error::recognition().with_message("mock recognizer failure"));
        }
        if self.texts.is_empty() {
            return Ok(String::new());
        }
        Ok(self.texts[call % self.texts.len()].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_detector_filters_by_threshold() {
        let detector = MockDetector::with_regions(vec![
            Region::new(95.0, BoundingBox::new(0.0, 0.0, 5.0, 5.0)),
            Region::new(40.0, BoundingBox::new(0.0, 6.0, 5.0, 11.0)),
        ]);
        let detections = detector.detect(b"png", 0.5).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections.confidences(), vec![95.0]);
        assert_eq!(detections.annotated_png.as_ref(), b"png");
    }

    #[tokio::test]
    async fn mock_recognizer_cycles_and_counts() {
        let recognizer = MockRecognizer::with_texts(vec!["a".into(), "b".into()]);
        let crop = Crop::new(Bytes::new(), BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(recognizer.recognize(&crop).await.unwrap(), "a");
        assert_eq!(recognizer.recognize(&crop).await.unwrap(), "b");
        assert_eq!(recognizer.recognize(&crop).await.unwrap(), "a");
        assert_eq!(recognizer.calls(), 3);
    }

    #[tokio::test]
    async fn mock_recognizer_fails_at_index() {
        let recognizer = MockRecognizer::with_texts(vec!["a".into()]).failing_at(1);
        let crop = Crop::new(Bytes::new(), BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(recognizer.recognize(&crop).await.is_ok());
        assert!(recognizer.recognize(&crop).await.is_err());
    }
}
