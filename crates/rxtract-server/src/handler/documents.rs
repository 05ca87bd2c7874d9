//! Read-back of prediction documents.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rxtract_store::BoxedDocumentStore;

use super::response::DocumentResponse;
use super::{Error, Result};
use crate::service::ServiceState;

/// Tracing target for document reads.
const TRACING_TARGET: &str = "rxtract_server::handler::documents";

/// Returns the current state of a prediction document.
///
/// Clients poll this while the background job runs; the `status` field
/// tells them whether the result lists are final.
#[tracing::instrument(skip_all, fields(document_id = %id))]
async fn fetch_document(
    State(document_store): State<BoxedDocumentStore>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>> {
    let document = document_store.fetch(&id).await.map_err(Error::from)?;

    tracing::debug!(
        target: TRACING_TARGET,
        status = %document.status,
        texts = document.texts.len(),
        "document fetched"
    );

    Ok(Json(document.into()))
}

/// Returns a [`Router`] with the document routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/documents/{id}", get(fetch_document))
}
