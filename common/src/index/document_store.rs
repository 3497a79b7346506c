use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{error::AppError, storage::store::StorageManager};

use super::VectorIndex;

/// Maps document ids to their vector indexes. Indexes live in memory once
/// loaded and survive restarts through the serialized copy in blob storage.
pub struct DocumentStore {
    storage: StorageManager,
    resident: RwLock<HashMap<String, Arc<VectorIndex>>>,
}

impl DocumentStore {
    pub fn new(storage: StorageManager) -> Self {
        Self {
            storage,
            resident: RwLock::new(HashMap::new()),
        }
    }

    fn index_location(document_id: &str) -> String {
        format!("indexes/{document_id}/index.json")
    }

    /// Persists the index and makes it resident, transitioning the document
    /// to queryable.
    pub async fn attach(&self, document_id: &str, index: VectorIndex) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(&index)?;
        self.storage
            .put(&Self::index_location(document_id), bytes.into())
            .await?;

        self.resident
            .write()
            .await
            .insert(document_id.to_string(), Arc::new(index));

        Ok(())
    }

    /// Memory-first lookup with a memoizing disk fallback: a cold id costs
    /// one storage read and populates the resident map.
    pub async fn get(&self, document_id: &str) -> Result<Arc<VectorIndex>, AppError> {
        if let Some(index) = self.resident.read().await.get(document_id) {
            return Ok(Arc::clone(index));
        }

        debug!(document_id, "index not resident, loading from storage");
        let index = Arc::new(self.load_persisted(document_id).await?);

        self.resident
            .write()
            .await
            .insert(document_id.to_string(), Arc::clone(&index));

        Ok(index)
    }

    /// Always reads a fresh copy from persisted storage, never the resident
    /// object. Merge inputs come from here so that merging can never mutate
    /// a document's own index.
    pub async fn load_persisted(&self, document_id: &str) -> Result<VectorIndex, AppError> {
        let bytes = self
            .storage
            .get(&Self::index_location(document_id))
            .await
            .map_err(|e| {
                AppError::from(e).missing_as_not_found(&format!("Document not found: {document_id}"))
            })?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Removes the resident entry and the persisted index. Idempotent.
    pub async fn delete(&self, document_id: &str) -> Result<(), AppError> {
        self.resident.write().await.remove(document_id);
        self.storage
            .delete_prefix(&format!("indexes/{document_id}"))
            .await?;
        Ok(())
    }

    pub async fn is_resident(&self, document_id: &str) -> bool {
        self.resident.read().await.contains_key(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunk;
    use crate::utils::embedding::EmbeddingProvider;

    async fn sample_index(provider: &EmbeddingProvider, texts: &[&str]) -> VectorIndex {
        let embeddings = provider
            .embed_batch(texts.iter().map(|t| (*t).to_string()).collect())
            .await
            .expect("embedding should succeed");
        VectorIndex::from_chunks(
            texts
                .iter()
                .zip(embeddings)
                .map(|(text, embedding)| Chunk::new((*text).to_string(), embedding))
                .collect(),
        )
    }

    #[tokio::test]
    async fn attach_makes_document_queryable() {
        let provider = EmbeddingProvider::new_hashed(64);
        let store = DocumentStore::new(StorageManager::memory());
        let index = sample_index(&provider, &["hello world"]).await;

        store.attach("doc-1", index).await.expect("attach");

        let fetched = store.get("doc-1").await.expect("get");
        assert_eq!(fetched.len(), 1);
    }

    #[tokio::test]
    async fn get_cold_id_loads_from_storage_and_memoizes() {
        let provider = EmbeddingProvider::new_hashed(64);
        let storage = StorageManager::memory();

        // Attach through one store, read through a second sharing the same
        // storage, simulating a restart with a cold resident map.
        let warm = DocumentStore::new(storage.clone());
        warm.attach("doc-1", sample_index(&provider, &["persisted"]).await)
            .await
            .expect("attach");

        let cold = DocumentStore::new(storage);
        assert!(!cold.is_resident("doc-1").await);

        let fetched = cold.get("doc-1").await.expect("get should disk-fallback");
        assert_eq!(fetched.len(), 1);
        assert!(cold.is_resident("doc-1").await);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = DocumentStore::new(StorageManager::memory());

        let result = store.get("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn load_persisted_returns_fresh_copies() {
        let provider = EmbeddingProvider::new_hashed(64);
        let store = DocumentStore::new(StorageManager::memory());
        store
            .attach("doc-1", sample_index(&provider, &["a", "b"]).await)
            .await
            .expect("attach");

        let live = store.get("doc-1").await.expect("get");
        let mut fresh = store.load_persisted("doc-1").await.expect("load");
        let other = sample_index(&provider, &["c"]).await;

        // Mutating the fresh copy must not affect the live index.
        fresh.merge_from(&other);
        assert_eq!(fresh.len(), 3);
        assert_eq!(live.len(), 2);
        assert_eq!(store.get("doc-1").await.expect("get").len(), 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_forgets_document() {
        let provider = EmbeddingProvider::new_hashed(64);
        let store = DocumentStore::new(StorageManager::memory());
        store
            .attach("doc-1", sample_index(&provider, &["bye"]).await)
            .await
            .expect("attach");

        store.delete("doc-1").await.expect("first delete");
        store.delete("doc-1").await.expect("second delete");

        assert!(matches!(
            store.get("doc-1").await,
            Err(AppError::NotFound(_))
        ));
    }
}
