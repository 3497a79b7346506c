use std::sync::Arc;

use bytes::Bytes;
use text_splitter::{ChunkConfig, TextSplitter};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use common::{
    error::AppError,
    index::{document_store::DocumentStore, Chunk, VectorIndex},
    storage::{
        db::SurrealDbClient,
        store::StorageManager,
        types::pdf_metadata::{DocumentStatus, PdfMetadata},
    },
    utils::embedding::EmbeddingProvider,
};

use crate::utils::pdf_ingestion::extract_pdf_text;

/// Character-based chunking window.
pub const CHUNK_MAX_CHARS: usize = 1000;
pub const CHUNK_OVERLAP_CHARS: usize = 200;

/// Turns raw uploaded bytes into a ready, queryable document: persist the
/// original file and pending metadata synchronously, then extract, chunk,
/// embed and index on a detached task.
pub struct IngestionPipeline {
    db: Arc<SurrealDbClient>,
    storage: StorageManager,
    documents: Arc<DocumentStore>,
    embeddings: Arc<EmbeddingProvider>,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        storage: StorageManager,
        documents: Arc<DocumentStore>,
        embeddings: Arc<EmbeddingProvider>,
    ) -> Self {
        Self {
            db,
            storage,
            documents,
            embeddings,
        }
    }

    /// Synchronous part of an upload: extension validation, id assignment,
    /// raw-byte persistence, pending registration. The caller gets metadata
    /// back before any processing happens.
    pub async fn accept_upload(
        &self,
        filename: &str,
        data: Bytes,
    ) -> Result<PdfMetadata, AppError> {
        validate_filename(filename)?;

        let metadata = PdfMetadata::new(filename.to_string(), data.len() as u64);
        self.storage
            .put(&upload_location(&metadata.id, filename), data)
            .await?;

        let metadata = metadata.create(&self.db).await?;
        info!(
            document_id = %metadata.id,
            filename = %metadata.filename,
            size = metadata.size,
            "accepted upload, processing scheduled"
        );

        Ok(metadata)
    }

    /// Fire-and-forget processing. Failures are never surfaced to the
    /// uploading caller; they are logged and the document is marked failed.
    pub fn spawn_processing(self: &Arc<Self>, document_id: String) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = pipeline.process_document(&document_id).await {
                error!(
                    document_id = %document_id,
                    error = %err,
                    "ingestion failed"
                );
                if let Err(status_err) =
                    PdfMetadata::set_status(&pipeline.db, &document_id, DocumentStatus::Failed)
                        .await
                {
                    error!(
                        document_id = %document_id,
                        error = %status_err,
                        "could not record ingestion failure"
                    );
                }
            }
        })
    }

    /// Extract text from the persisted upload and index it.
    #[instrument(skip(self))]
    pub async fn process_document(&self, document_id: &str) -> Result<(), AppError> {
        let metadata = PdfMetadata::get(&self.db, document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document not found: {document_id}")))?;

        let raw = self
            .storage
            .get(&upload_location(document_id, &metadata.filename))
            .await
            .map_err(|e| {
                AppError::from(e)
                    .missing_as_not_found(&format!("Upload not found for document: {document_id}"))
            })?;

        let text = extract_pdf_text(raw.to_vec()).await?;
        self.index_extracted_text(document_id, &text).await
    }

    /// Chunk, embed, build and attach the index, then mark the document
    /// ready.
    pub async fn index_extracted_text(
        &self,
        document_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        let chunk_texts = chunk_text(text)?;
        let embeddings = self.embeddings.embed_batch(chunk_texts.clone()).await?;

        let chunks: Vec<Chunk> = chunk_texts
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Chunk::new(chunk, embedding))
            .collect();
        let chunk_count = chunks.len();

        self.documents
            .attach(document_id, VectorIndex::from_chunks(chunks))
            .await?;
        PdfMetadata::set_status(&self.db, document_id, DocumentStatus::Ready).await?;

        info!(document_id, chunk_count, "document indexed and ready");
        Ok(())
    }

    /// Removes metadata, the raw upload and the index. Idempotent.
    pub async fn delete_document(&self, document_id: &str) -> Result<(), AppError> {
        PdfMetadata::delete(&self.db, document_id).await?;
        self.storage
            .delete_prefix(&format!("uploads/{document_id}"))
            .await?;
        self.documents.delete(document_id).await?;

        info!(document_id, "document deleted");
        Ok(())
    }
}

/// Uploads are accepted by extension only; extraction decides later whether
/// the bytes are actually parseable.
pub fn validate_filename(filename: &str) -> Result<(), AppError> {
    if filename.to_lowercase().ends_with(".pdf") {
        Ok(())
    } else {
        Err(AppError::UnsupportedType(format!(
            "Only PDF files are allowed: {filename}"
        )))
    }
}

fn upload_location(document_id: &str, filename: &str) -> String {
    format!("uploads/{document_id}/{}", sanitize_file_name(filename))
}

/// Keeps object-store locations free of traversal and separator characters.
fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Overlapping character windows over the extracted text. A document with no
/// text still gets one empty chunk so that an index always exists.
fn chunk_text(text: &str) -> Result<Vec<String>, AppError> {
    let chunk_config = ChunkConfig::new(CHUNK_MAX_CHARS)
        .with_overlap(CHUNK_OVERLAP_CHARS)
        .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;
    let splitter = TextSplitter::new(chunk_config);

    let mut chunks: Vec<String> = splitter.chunks(text).map(str::to_owned).collect();

    if chunks.is_empty() {
        chunks.push(String::new());
    }

    Ok(chunks)
}
