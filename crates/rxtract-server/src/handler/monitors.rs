//! Liveness monitoring.

use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::service::ServiceState;

/// Health check response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: jiff::Timestamp,
}

/// Reports that the process is alive and serving requests. Dependency
/// reachability is left to the deployment's own probes.
async fn health_status() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        updated_at: jiff::Timestamp::now(),
    })
}

/// Returns a [`Router`] with the health route.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rxtract_core::mock::{MockDetector, MockRecognizer};

    use super::super::test::create_test_server;

    #[tokio::test]
    async fn health_is_public_and_ok() {
        let detector = Arc::new(MockDetector::with_regions(vec![]));
        let recognizer = Arc::new(MockRecognizer::with_texts(vec![]));
        let (server, _store) = create_test_server(detector, recognizer).await;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["status"], "ok");
        assert!(body["updatedAt"].is_string());
    }
}
