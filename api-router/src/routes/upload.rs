use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use ingestion_pipeline::pipeline::validate_filename;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "unlimited")]
    #[form_data(default)]
    pub files: Vec<FieldData<NamedTempFile>>,
}

#[derive(Debug, Serialize)]
pub struct UploadReceipt {
    pub document_id: String,
    pub message: String,
}

pub async fn upload_pdfs(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    if input.files.is_empty() {
        return Err(ApiError::ValidationError("No files provided".to_string()));
    }

    // A bad extension anywhere in the batch rejects the whole request before
    // any file is accepted.
    for file in &input.files {
        validate_filename(original_file_name(file)?)?;
    }

    info!(file_count = input.files.len(), "received upload request");

    let mut receipts = Vec::with_capacity(input.files.len());
    for file in input.files {
        let filename = original_file_name(&file)?.to_string();
        let data = tokio::fs::read(file.contents.path())
            .await
            .map_err(common::error::AppError::from)?;

        let metadata = state.ingestion.accept_upload(&filename, data.into()).await?;
        state.ingestion.spawn_processing(metadata.id.clone());

        receipts.push(UploadReceipt {
            message: format!(
                "PDF '{}' uploaded and processing started",
                metadata.filename
            ),
            document_id: metadata.id,
        });
    }

    Ok((StatusCode::OK, Json(receipts)))
}

fn original_file_name(file: &FieldData<NamedTempFile>) -> Result<&str, ApiError> {
    file.metadata.file_name.as_deref().ok_or_else(|| {
        ApiError::ValidationError("Uploaded file is missing a filename".to_string())
    })
}
