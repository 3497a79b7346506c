use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub document_ids: Vec<String>,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

pub async fn query_documents(
    State(state): State<ApiState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    info!(
        document_count = request.document_ids.len(),
        query_bytes = request.query.len(),
        "received query request"
    );

    let result = state
        .answering
        .answer(&request.document_ids, &request.query)
        .await?;

    Ok(Json(QueryResponse {
        answer: result.answer,
        sources: result.sources,
    }))
}
