#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod detection;
pub mod document;
pub mod geometry;
pub mod mock;
pub mod provider;

pub use detection::{Crop, Detections, Region};
pub use document::{DocumentStatus, PredictionDocument};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use geometry::BoundingBox;
pub use provider::{BoxedDetector, BoxedRecognizer, DetectProvider, RecognizeProvider};
