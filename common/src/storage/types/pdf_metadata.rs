use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient};

use super::{surreal_serde, StoredObject};

/// Lifecycle of an uploaded document. A document is queryable only once its
/// index exists (`Ready`); `Failed` records an ingestion error that was
/// logged but never surfaced to the uploading caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        }
    }
}

/// One row per uploaded document. `created_at` doubles as the upload date
/// reported by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PdfMetadata {
    #[serde(deserialize_with = "surreal_serde::deserialize_flexible_id")]
    pub id: String,
    #[serde(
        serialize_with = "surreal_serde::serialize_datetime",
        deserialize_with = "surreal_serde::deserialize_datetime",
        default
    )]
    pub created_at: DateTime<Utc>,
    pub filename: String,
    pub size: u64,
    #[serde(default)]
    pub status: DocumentStatus,
}

impl StoredObject for PdfMetadata {
    fn table_name() -> &'static str {
        "pdf_metadata"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}

impl PdfMetadata {
    pub fn new(filename: String, size: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            filename,
            size,
            status: DocumentStatus::Pending,
        }
    }

    /// Registers a new pending document. Ids are generated, so a collision
    /// is an internal invariant violation rather than a user error.
    pub async fn create(self, db: &SurrealDbClient) -> Result<Self, AppError> {
        if db.get_item::<Self>(&self.id).await?.is_some() {
            return Err(AppError::DuplicateId(self.id));
        }

        db.store_item(self.clone()).await?;
        Ok(self)
    }

    pub async fn get(db: &SurrealDbClient, id: &str) -> Result<Option<Self>, AppError> {
        Ok(db.get_item(id).await?)
    }

    pub async fn get_all(db: &SurrealDbClient) -> Result<Vec<Self>, AppError> {
        Ok(db.get_all_stored_items().await?)
    }

    /// Transitions a registered document; fails with `NotFound` for ids that
    /// were never registered.
    pub async fn set_status(
        db: &SurrealDbClient,
        id: &str,
        status: DocumentStatus,
    ) -> Result<(), AppError> {
        let mut metadata: Self = db
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document not found: {id}")))?;

        metadata.status = status;
        let _updated: Option<Self> = db
            .update((Self::table_name(), id))
            .content(metadata)
            .await?;

        Ok(())
    }

    /// Idempotent: deleting an absent row is not an error.
    pub async fn delete(db: &SurrealDbClient, id: &str) -> Result<(), AppError> {
        let _deleted: Option<Self> = db.delete_item(id).await?;
        Ok(())
    }
}
