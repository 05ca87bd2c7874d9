//! Service traits for the two inference components.
//!
//! The detector and recognizer are injectable service objects rather than
//! ambient singletons: the HTTP layer and the background pipeline only ever
//! see these traits, so tests and alternative backends plug in without
//! touching the orchestration code.

use std::sync::Arc;

use crate::detection::{Crop, Detections};
use crate::error::Result;

/// Type alias for a shared, dynamically dispatched detector.
pub type BoxedDetector = Arc<dyn DetectProvider>;

/// Type alias for a shared, dynamically dispatched recognizer.
pub type BoxedRecognizer = Arc<dyn RecognizeProvider>;

/// Locates text-bearing regions in a full input image.
#[async_trait::async_trait]
pub trait DetectProvider: Send + Sync {
    /// Detects all text regions with confidence above `threshold` (0.0-1.0).
    ///
    /// `image` is the encoded source image as uploaded. Returns the region
    /// list in model output order plus an annotated visualization; no partial
    /// results are returned on failure.
    async fn detect(&self, image: &[u8], threshold: f32) -> Result<Detections>;
}

/// Transcribes a single cropped image into text.
#[async_trait::async_trait]
pub trait RecognizeProvider: Send + Sync {
    /// Returns the best-effort transcription of one crop.
    ///
    /// Stateless per call; a failure is a single opaque recognition error
    /// with no retry and no partial output.
    async fn recognize(&self, crop: &Crop) -> Result<String>;
}
