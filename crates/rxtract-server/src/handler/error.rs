//! Handler error type mapping every failure onto the response envelope.

use std::borrow::Cow;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::response::DetectResponse;

/// The error type for HTTP handlers.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
}

impl Error {
    /// Creates a new [`Error`] with the specified kind.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Sets a custom message for the error.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message sent to the client.
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.kind,
            self.kind.status_code(),
            self.message()
        )
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let body = DetectResponse::failure(self.message());
        (status, Json(body)).into_response()
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A specialized [`Result`] type for HTTP handlers.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Closed set of failures the HTTP surface can report.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 403 Forbidden, wrong or missing API key.
    Forbidden,
    /// 404 Not Found, unknown document.
    NotFound,
    /// 415 Unsupported Media Type, payload is not a decodable image.
    InvalidMediaType,
    /// 500 Internal Server Error.
    #[default]
    Internal,
}

impl ErrorKind {
    /// Converts this error kind into a full [`Error`].
    #[inline]
    pub fn into_error(self) -> Error {
        Error::new(self)
    }

    /// Creates an [`Error`] with the specified message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        Error::new(self).with_message(message)
    }

    /// Returns the HTTP status code for this error kind.
    #[inline]
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message used when the error carries no custom one.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT FOUND",
            Self::InvalidMediaType => "INVALID MEDIA TYPE",
            Self::Internal => "INTERNAL SERVER ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_message())
    }
}

impl IntoResponse for ErrorKind {
    #[inline]
    fn into_response(self) -> Response {
        self.into_error().into_response()
    }
}

impl From<rxtract_core::Error> for Error {
    fn from(error: rxtract_core::Error) -> Self {
        let kind = match error.kind() {
            rxtract_core::ErrorKind::InvalidImage => ErrorKind::InvalidMediaType,
            _ => ErrorKind::Internal,
        };
        kind.with_message(error.to_string())
    }
}

impl From<rxtract_vision::Error> for Error {
    fn from(error: rxtract_vision::Error) -> Self {
        if error.is_invalid_image() {
            ErrorKind::InvalidMediaType.into_error()
        } else {
            ErrorKind::Internal.with_message(error.to_string())
        }
    }
}

impl From<rxtract_store::StorageError> for Error {
    fn from(error: rxtract_store::StorageError) -> Self {
        if error.is_not_found() {
            ErrorKind::NotFound.into_error()
        } else {
            ErrorKind::Internal.with_message(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(ErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorKind::InvalidMediaType.status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ErrorKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn custom_message_overrides_default() {
        let error = ErrorKind::Internal.with_message("upload failed");
        assert_eq!(error.message(), "upload failed");
        assert_eq!(ErrorKind::Internal.into_error().message(), "INTERNAL SERVER ERROR");
    }

    #[test]
    fn invalid_image_errors_map_to_415() {
        let core = rxtract_core::Error::invalid_image().with_message("bad bytes");
        let error: Error = core.into();
        assert_eq!(error.kind(), ErrorKind::InvalidMediaType);
    }

    #[test]
    fn missing_document_maps_to_404() {
        let store = rxtract_store::StorageError::not_found("abc");
        let error: Error = store.into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }
}
