pub mod document_store;

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contiguous slice of a document's extracted text together with its
/// embedding. The single, stable result shape of every search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn new(text: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            embedding,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// A searchable collection of embedded text chunks, exact cosine similarity,
/// serializable for per-document persistence. Each index carries a stable
/// identity so that merging an index with a copy of itself is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    index_id: String,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            index_id: Uuid::new_v4().to_string(),
            chunks,
        }
    }

    pub fn index_id(&self) -> &str {
        &self.index_id
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Top-k chunks by cosine similarity against the query embedding.
    /// Ordering is descending by score; ties keep insertion order, so
    /// repeated searches over the same data are stable.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Absorbs the other index's chunks. The receiver keeps its identity.
    /// Merging an index with itself (or a persisted copy of itself) is a
    /// no-op, and chunks already present by id are skipped.
    pub fn merge_from(&mut self, other: &VectorIndex) {
        if other.index_id == self.index_id {
            return;
        }

        let present: HashSet<&str> = self.chunks.iter().map(|c| c.id.as_str()).collect();
        let additions: Vec<Chunk> = other
            .chunks
            .iter()
            .filter(|chunk| !present.contains(chunk.id.as_str()))
            .cloned()
            .collect();

        self.chunks.extend(additions);
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
