//! Shared-secret authentication over the `x-api-key` header.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::handler::ErrorKind;
use crate::service::ApiKeySecret;

/// Tracing target for authentication.
const TRACING_TARGET: &str = "rxtract_server::middleware::api_key";

/// Header carrying the client's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects the request with 403 unless the `x-api-key` header exactly
/// matches the configured secret. Runs before any body processing.
pub async fn require_api_key(
    State(secret): State<ApiKeySecret>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if secret.matches(key) => next.run(request).await,
        Some(_) => {
            tracing::warn!(target: TRACING_TARGET, "rejected request with wrong api key");
            ErrorKind::Forbidden.into_response()
        }
        None => {
            tracing::warn!(target: TRACING_TARGET, "rejected request with missing api key");
            ErrorKind::Forbidden.into_response()
        }
    }
}
