use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Duplicate document id: {0}")]
    DuplicateId(String),
    #[error("Text extraction failed: {0}")]
    Extraction(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Collapses the storage backend's missing-object error into the domain
    /// level `NotFound`, so callers never branch on `object_store` internals.
    pub fn missing_as_not_found(self, what: &str) -> Self {
        match self {
            Self::Storage(object_store::Error::NotFound { .. }) => {
                Self::NotFound(what.to_string())
            }
            other => other,
        }
    }
}
