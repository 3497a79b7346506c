use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};

use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Blob storage for raw uploads and serialized indexes. Local filesystem in
/// production, in-memory in tests; both speak the same `ObjectStore` API.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
}

impl StorageManager {
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let store: DynStore = match cfg.storage {
            StorageKind::Local => {
                tokio::fs::create_dir_all(&cfg.data_dir)
                    .await
                    .map_err(|source| object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: Box::new(source),
                    })?;
                Arc::new(LocalFileSystem::new_with_prefix(&cfg.data_dir)?)
            }
            StorageKind::Memory => Arc::new(InMemory::new()),
        };

        Ok(Self {
            store,
            backend_kind: cfg.storage.clone(),
        })
    }

    /// In-memory manager for tests; contents live as long as the manager.
    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            backend_kind: StorageKind::Memory,
        }
    }

    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    /// Retrieve the full contents buffered in memory. Fails with the
    /// backend's `NotFound` when the location is absent.
    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }

    /// Delete all objects below the specified prefix. Deleting an empty or
    /// unknown prefix is a no-op.
    pub async fn delete_prefix(&self, prefix: &str) -> object_store::Result<()> {
        let prefix_path = ObjPath::from(prefix);
        let locations = self
            .store
            .list(Some(&prefix_path))
            .map_ok(|m| m.location)
            .boxed();
        self.store
            .delete_stream(locations)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let storage = StorageManager::memory();

        storage
            .put("uploads/doc-1/file.pdf", Bytes::from_static(b"pdf bytes"))
            .await
            .expect("put should succeed");

        let fetched = storage
            .get("uploads/doc-1/file.pdf")
            .await
            .expect("get should succeed");
        assert_eq!(fetched, Bytes::from_static(b"pdf bytes"));
    }

    #[tokio::test]
    async fn get_missing_location_is_not_found() {
        let storage = StorageManager::memory();

        let err = storage
            .get("indexes/missing/index.json")
            .await
            .expect_err("missing object should error");
        assert!(matches!(err, object_store::Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_prefix_removes_all_objects_below() {
        let storage = StorageManager::memory();

        storage
            .put("uploads/doc-1/a.pdf", Bytes::from_static(b"a"))
            .await
            .expect("put");
        storage
            .put("uploads/doc-1/b.pdf", Bytes::from_static(b"b"))
            .await
            .expect("put");
        storage
            .put("uploads/doc-2/c.pdf", Bytes::from_static(b"c"))
            .await
            .expect("put");

        storage
            .delete_prefix("uploads/doc-1")
            .await
            .expect("delete_prefix should succeed");

        assert!(!storage.exists("uploads/doc-1/a.pdf").await.expect("head"));
        assert!(!storage.exists("uploads/doc-1/b.pdf").await.expect("head"));
        assert!(storage.exists("uploads/doc-2/c.pdf").await.expect("head"));
    }

    #[tokio::test]
    async fn delete_prefix_of_unknown_prefix_is_noop() {
        let storage = StorageManager::memory();

        storage
            .delete_prefix("uploads/never-created")
            .await
            .expect("deleting an unknown prefix should not error");
    }
}
