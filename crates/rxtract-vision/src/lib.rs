#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod detector;
mod error;
mod recognizer;

pub mod image_ops;

pub use config::InferenceConfig;
pub use detector::DetectorClient;
pub use error::{Error, Result};
pub use recognizer::RecognizerClient;

/// Tracing target for the detection client.
pub const TRACING_TARGET_DETECTOR: &str = "rxtract_vision::detector";

/// Tracing target for the recognition client.
pub const TRACING_TARGET_RECOGNIZER: &str = "rxtract_vision::recognizer";
