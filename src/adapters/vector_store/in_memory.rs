//! In-memory vector store, used by tests and as the default for
//! single-process/library-embedding scenarios (`SPEC_FULL.md` §4.6).

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{ChunkId, Result};
use crate::ports::vector_store::{PayloadFilter, SearchHit, VectorPoint, VectorStoreProvider};

struct Collection {
    dimension: usize,
    points: DashMap<ChunkId, VectorPoint>,
}

/// A `dashmap`-backed map of collection name → points. Never persisted;
/// the process owning it is the only reader/writer.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: DashMap<String, Collection>,
}

impl InMemoryVectorStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        if let Some(existing) = self.collections.get(collection) {
            if existing.dimension != dimension {
                return Err(crate::domain::IndexError::collection(format!(
                    "collection {collection} already exists with dimension {}, got {dimension}",
                    existing.dimension
                )));
            }
            return Ok(());
        }
        self.collections.insert(collection.to_string(), Collection { dimension, points: DashMap::new() });
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()> {
        let entry = self
            .collections
            .get(collection)
            .ok_or_else(|| crate::domain::IndexError::collection(format!("collection {collection} does not exist")))?;
        for point in points {
            if point.vector.len() != entry.dimension {
                return Err(crate::domain::IndexError::collection(format!(
                    "point {} has dimension {}, collection expects {}",
                    point.id,
                    point.vector.len(),
                    entry.dimension
                )));
            }
            entry.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[ChunkId]) -> Result<()> {
        if let Some(entry) = self.collections.get(collection) {
            for id in ids {
                entry.points.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<usize> {
        let Some(entry) = self.collections.get(collection) else { return Ok(0) };
        let to_remove: Vec<ChunkId> = entry.points.iter().filter(|r| filter.matches(&r.payload)).map(|r| r.id.clone()).collect();
        for id in &to_remove {
            entry.points.remove(id);
        }
        Ok(to_remove.len())
    }

    async fn scroll(&self, collection: &str, filter: &PayloadFilter) -> Result<Vec<VectorPoint>> {
        let Some(entry) = self.collections.get(collection) else { return Ok(Vec::new()) };
        Ok(entry.points.iter().filter(|r| filter.matches(&r.payload)).map(|r| r.value().clone()).collect())
    }

    async fn search(&self, collection: &str, query_vector: &[f32], limit: usize, filter: Option<&PayloadFilter>) -> Result<Vec<SearchHit>> {
        let Some(entry) = self.collections.get(collection) else { return Ok(Vec::new()) };
        let mut hits: Vec<SearchHit> = entry
            .points
            .iter()
            .filter(|r| filter.is_none_or(|f| f.matches(&r.payload)))
            .map(|r| SearchHit { id: r.id.clone(), score: cosine_similarity(query_vector, &r.vector), payload: r.payload.clone() })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkKind, ChunkPayload};

    fn point(id: &str, vector: Vec<f32>, file_path: &str) -> VectorPoint {
        VectorPoint {
            id: ChunkId::new(file_path, id, ChunkKind::Metadata, "1"),
            vector,
            payload: ChunkPayload {
                chunk_kind: ChunkKind::Metadata,
                entity_name: id.to_string(),
                entity_kind: "function".to_string(),
                file_path: Some(file_path.to_string()),
                start_line: Some(1),
                end_line: Some(1),
                has_implementation: Some(true),
                source_hash: None,
                parsed_at: None,
                observations: vec![],
                relation_kind: None,
                from: None,
                to: None,
                aliases: None,
            },
        }
    }

    #[tokio::test]
    async fn upsert_then_scroll_round_trips() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("demo", 2).await.unwrap();
        store.upsert("demo", vec![point("foo", vec![1.0, 0.0], "a.rs")]).await.unwrap();
        let all = store.scroll("demo", &PayloadFilter::all()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn search_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("demo", 2).await.unwrap();
        store
            .upsert("demo", vec![point("close", vec![1.0, 0.0], "a.rs"), point("far", vec![0.0, 1.0], "b.rs")])
            .await
            .unwrap();
        let hits = store.search("demo", &[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits[0].payload.entity_name, "close");
    }

    #[tokio::test]
    async fn dimension_mismatch_on_ensure_is_a_collection_error() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("demo", 2).await.unwrap();
        let err = store.ensure_collection("demo", 3).await.unwrap_err();
        assert!(matches!(err, crate::domain::IndexError::Collection { .. }));
    }

    #[tokio::test]
    async fn delete_by_filter_removes_matching_points_only() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("demo", 2).await.unwrap();
        store
            .upsert("demo", vec![point("foo", vec![1.0, 0.0], "a.rs"), point("bar", vec![0.0, 1.0], "b.rs")])
            .await
            .unwrap();
        let removed = store.delete_by_filter("demo", &PayloadFilter::by_file("a.rs")).await.unwrap();
        assert_eq!(removed, 1);
        let remaining = store.scroll("demo", &PayloadFilter::all()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload.file_path.as_deref(), Some("b.rs"));
    }
}
