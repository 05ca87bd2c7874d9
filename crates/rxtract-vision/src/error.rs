//! Error types for the inference clients.

/// Result type for inference operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for detection and recognition calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client/connection errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Inference API error response
    #[error("inference API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The service answered 2xx but the payload did not match the contract
    #[error("invalid inference response: {reason}")]
    InvalidResponse { reason: String },

    /// Invalid or undecodable image data
    #[error("invalid image data: {reason}")]
    InvalidImage { reason: String },

    /// Invalid client configuration
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Local image operation (crop, annotate, encode) failed
    #[error("image operation failed: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create an invalid image error.
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns true for the undecodable-payload case, which the HTTP layer
    /// maps to 415 instead of 500.
    pub fn is_invalid_image(&self) -> bool {
        matches!(self, Self::InvalidImage { .. })
    }
}
