//! Detection results carried between the detector, the request handler and
//! the background recognition pipeline.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// A single detected text region: a confidence score on the 0-100 scale plus
/// its bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Detection confidence, 0-100.
    pub confidence: f32,
    /// Region location in source-image pixel space.
    pub bbox: BoundingBox,
}

impl Region {
    /// Creates a new region.
    pub fn new(confidence: f32, bbox: BoundingBox) -> Self {
        Self { confidence, bbox }
    }
}

/// The full result of one detection pass: the ordered region list plus the
/// annotated visualization image.
///
/// Region order is load-bearing: crops, confidences and recognized texts all
/// stay aligned by index through the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct Detections {
    /// Detected regions, in model output order.
    pub regions: Vec<Region>,
    /// PNG-encoded source image with boxes drawn on it.
    pub annotated_png: Bytes,
}

impl Detections {
    /// Creates a new detection result.
    pub fn new(regions: Vec<Region>, annotated_png: Bytes) -> Self {
        Self {
            regions,
            annotated_png,
        }
    }

    /// Number of detected regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true when no region cleared the threshold.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Confidences in region order, 0-100 scale.
    pub fn confidences(&self) -> Vec<f32> {
        self.regions.iter().map(|r| r.confidence).collect()
    }

    /// Bounding boxes in region order.
    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.regions.iter().map(|r| r.bbox).collect()
    }
}

/// A cropped sub-image plus its originating box.
///
/// Lifetime is bound to a single request: crops are produced right after
/// detection and consumed by the background recognition pass.
#[derive(Debug, Clone)]
pub struct Crop {
    /// PNG-encoded crop pixels.
    pub png: Bytes,
    /// The box this crop was cut from.
    pub bbox: BoundingBox,
}

impl Crop {
    /// Creates a new crop.
    pub fn new(png: Bytes, bbox: BoundingBox) -> Self {
        Self { png, bbox }
    }
}
