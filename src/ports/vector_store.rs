//! The vector store contract (C6).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ChunkId, ChunkPayload, Result};

/// A single stored point: vector plus payload, keyed by chunk id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    /// Stable chunk identifier, also the store's point id.
    pub id: ChunkId,
    /// The embedded vector.
    pub vector: Vec<f32>,
    /// Filterable/displayable metadata.
    pub payload: ChunkPayload,
}

/// A filter predicate over point payloads, used by `scroll` and
/// `delete_by_ids`'s sibling `delete_by_filter`-style calls in the
/// orchestration layer. Kept deliberately small: the indexer's own
/// filtering needs (by file path, by chunk kind) are the only shapes
/// required by `SPEC_FULL.md` §4.6.
#[derive(Debug, Clone, Default)]
pub struct PayloadFilter {
    /// Restrict to points whose `file_path` equals this value.
    pub file_path: Option<String>,
    /// Restrict to points whose `chunk_kind` equals this value.
    pub chunk_kind: Option<crate::domain::ChunkKind>,
}

impl PayloadFilter {
    /// A filter matching every point.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter restricted to one file path.
    pub fn by_file(file_path: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            chunk_kind: None,
        }
    }

    /// Whether `payload` satisfies this filter.
    pub fn matches(&self, payload: &ChunkPayload) -> bool {
        if let Some(path) = &self.file_path {
            if payload.file_path.as_deref() != Some(path.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.chunk_kind {
            if payload.chunk_kind != kind {
                return false;
            }
        }
        true
    }
}

/// A single vector-search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Matching point id.
    pub id: ChunkId,
    /// Similarity score (higher is more similar).
    pub score: f32,
    /// The matched payload.
    pub payload: ChunkPayload,
}

/// Storage and retrieval of embedded chunks for one named collection.
///
/// A collection is created lazily on first use with whatever dimension
/// the active embedder reports; mixing embedders of different dimension
/// against the same collection is a `IndexError::Collection` error, not a
/// panic.
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create the named collection with the given vector dimension if it
    /// does not already exist. Idempotent.
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Insert or overwrite points by id.
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()>;

    /// Delete points by id; ids that do not exist are ignored.
    async fn delete_by_ids(&self, collection: &str, ids: &[ChunkId]) -> Result<()>;

    /// Delete every point whose payload matches `filter`. Used by GC and
    /// by clearing policies; returns the number of points removed.
    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<usize>;

    /// Iterate every point matching `filter` without a vector query.
    async fn scroll(&self, collection: &str, filter: &PayloadFilter) -> Result<Vec<VectorPoint>>;

    /// Nearest-neighbor search against `query_vector`, optionally
    /// restricted by `filter`, returning at most `limit` hits ordered by
    /// descending score.
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<SearchHit>>;
}
