//! Landing route.

use axum::Router;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;

use crate::service::{RuntimeSettings, ServiceState};

const LANDING_PAGE: &str = "<!doctype html>\n<html>\n<head><title>rxtract</title></head>\n<body>\n<h1>rxtract</h1>\n<p>Prescription-image extraction service. POST an image to <code>/detect_img</code>.</p>\n</body>\n</html>\n";

/// Redirects to the configured frontend, or serves a minimal landing page.
async fn index(State(settings): State<RuntimeSettings>) -> Response {
    match &settings.redirect_url {
        Some(url) => Redirect::temporary(url.as_str()).into_response(),
        None => Html(LANDING_PAGE).into_response(),
    }
}

/// Returns a [`Router`] with the landing route.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/", get(index))
}
