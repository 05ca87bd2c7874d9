//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! Routes split into a private group behind the API-key middleware
//! (`/detect_img`, `/documents/{id}`) and a public group (`/`, `/health`).
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod detections;
mod documents;
mod error;
mod index;
mod monitors;
mod response;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};

pub use self::error::{Error, ErrorKind, Result};
pub use self::response::{DetectResponse, DocumentResponse};
use crate::middleware::require_api_key;
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all private routes.
fn private_routes() -> Router<ServiceState> {
    Router::new()
        .merge(detections::routes())
        .merge(documents::routes())
}

/// Returns a [`Router`] with all public routes.
fn public_routes() -> Router<ServiceState> {
    Router::new().merge(index::routes()).merge(monitors::routes())
}

/// Returns a [`Router`] with all routes and the API-key layer applied to
/// the private group.
pub fn routes(state: ServiceState) -> Router<ServiceState> {
    let require_api_key = from_fn_with_state(state, require_api_key);

    let private_router = private_routes().route_layer(require_api_key);
    let public_router = public_routes();

    Router::new()
        .merge(private_router)
        .merge(public_router)
        .fallback(fallback)
}
