use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use common::storage::types::pdf_metadata::PdfMetadata;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub filename: String,
    pub upload_date: String,
    pub size: u64,
    pub status: String,
}

pub async fn list_documents(
    State(state): State<ApiState>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    let mut documents = PdfMetadata::get_all(&state.db).await?;
    documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let summaries = documents
        .into_iter()
        .map(|doc| DocumentSummary {
            document_id: doc.id,
            filename: doc.filename,
            upload_date: doc.created_at.to_rfc3339(),
            size: doc.size,
            status: doc.status.as_str().to_string(),
        })
        .collect();

    Ok(Json(summaries))
}

pub async fn delete_document(
    State(state): State<ApiState>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.ingestion.delete_document(&document_id).await?;
    info!(document_id = %document_id, "handled delete request");

    Ok(Json(json!({
        "message": format!("Document {document_id} deleted successfully")
    })))
}
