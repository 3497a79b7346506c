use api_state::ApiState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use routes::{
    documents::{delete_document, list_documents},
    health::health_check,
    query::query_documents,
    upload::upload_pdfs,
};

pub mod api_state;
pub mod error;
mod routes;

/// HTTP surface of the document question-answering service.
pub fn api_routes(state: ApiState) -> Router {
    let upload_body_limit = state.config.upload_max_body_bytes;

    Router::new()
        .route(
            "/upload/",
            post(upload_pdfs).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/documents/", get(list_documents))
        .route("/documents/{document_id}", delete(delete_document))
        .route("/query/", post(query_documents))
        .route("/health", get(health_check))
        .with_state(state)
}
