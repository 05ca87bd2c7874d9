//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Commonly used as the source error in the structured [`Error`] type,
/// wrapping any error that implements the standard `Error` trait while
/// keeping Send and Sync bounds for multi-threaded contexts.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur in the extraction pipeline.
///
/// One variant per component boundary: input validation, the two model
/// inference sites, and the two storage sites. Each failure keeps its
/// category instead of collapsing into a single opaque message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The uploaded payload is not a decodable image.
    InvalidImage,
    /// The detection model call failed.
    Detection,
    /// The recognition model call failed.
    Recognition,
    /// An object-storage operation failed.
    ObjectStore,
    /// A document-store operation failed.
    DocumentStore,
    /// Configuration error.
    Configuration,
    /// Internal invariant violation.
    Internal,
}

/// A structured error type for pipeline operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid image error.
    pub fn invalid_image() -> Self {
        Self::new(ErrorKind::InvalidImage)
    }

    /// Creates a new detection error.
    pub fn detection() -> Self {
        Self::new(ErrorKind::Detection)
    }

    /// Creates a new recognition error.
    pub fn recognition() -> Self {
        Self::new(ErrorKind::Recognition)
    }

    /// Creates a new object store error.
    pub fn object_store() -> Self {
        Self::new(ErrorKind::ObjectStore)
    }

    /// Creates a new document store error.
    pub fn document_store() -> Self {
        Self::new(ErrorKind::DocumentStore)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_carries_kind_and_message() {
        let error = Error::detection().with_message("endpoint unreachable");
        assert_eq!(error.kind(), ErrorKind::Detection);
        assert_eq!(error.to_string(), "Detection: endpoint unreachable");
    }

    #[test]
    fn error_chains_source() {
        let source = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let error = Error::recognition().with_source(source);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn kind_str_is_snake_case() {
        assert_eq!(Error::invalid_image().kind_str(), "invalid_image");
        assert_eq!(Error::document_store().kind_str(), "document_store");
    }
}
