use std::{collections::HashMap, fmt, sync::Arc};

use common::{error::AppError, index::document_store::DocumentStore, index::VectorIndex};
use tokio::sync::RwLock;
use tracing::debug;

/// Canonical identity of a set of documents queried together: deduplicated
/// and sorted ascending, so set-equal requests always produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(Vec<String>);

impl SessionKey {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The sole member id when the key names exactly one document.
    pub fn as_single(&self) -> Option<&str> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("+"))
    }
}

/// Memoizes one merged index per multi-document session key. Single-document
/// keys bypass the cache entirely so they always reflect the live index.
///
/// Entries are never invalidated when a member document is later deleted or
/// re-ingested; stale merged sessions stay reachable.
pub struct SessionCache {
    documents: Arc<DocumentStore>,
    merged: RwLock<HashMap<SessionKey, Arc<VectorIndex>>>,
}

impl SessionCache {
    pub fn new(documents: Arc<DocumentStore>) -> Self {
        Self {
            documents,
            merged: RwLock::new(HashMap::new()),
        }
    }

    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.documents
    }

    /// Resolves a session key to a searchable index, building and memoizing
    /// the merged index for multi-document keys on first use.
    ///
    /// Member indexes are always reloaded fresh from persisted storage for
    /// the merge; the destructive merge therefore only ever touches working
    /// copies, never a document's own resident index. Concurrent misses on
    /// the same key may merge redundantly; last write wins and the results
    /// are identical.
    pub async fn resolve(&self, key: &SessionKey) -> Result<Arc<VectorIndex>, AppError> {
        if key.is_empty() {
            return Err(AppError::Validation(
                "At least one document id is required".into(),
            ));
        }

        if let Some(document_id) = key.as_single() {
            return self.documents.get(document_id).await;
        }

        if let Some(index) = self.merged.read().await.get(key) {
            return Ok(Arc::clone(index));
        }

        debug!(session_key = %key, "building merged session index");
        let mut members = key.ids().iter();
        // The key is non-empty and multi-member here.
        let first = members
            .next()
            .ok_or_else(|| AppError::Validation("empty session key".into()))?;
        let mut combined = self.documents.load_persisted(first).await?;
        for document_id in members {
            let other = self.documents.load_persisted(document_id).await?;
            combined.merge_from(&other);
        }

        let combined = Arc::new(combined);
        self.merged
            .write()
            .await
            .insert(key.clone(), Arc::clone(&combined));

        Ok(combined)
    }
}
