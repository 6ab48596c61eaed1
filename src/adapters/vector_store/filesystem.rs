//! Filesystem-backed vector store: one JSON document per collection,
//! persisted with the same write-temp/fsync/rename discipline as the
//! state store (C4), per `SPEC_FULL.md` §4.6.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ChunkId, Result};
use crate::infrastructure::atomic_file::write_atomic;
use crate::ports::vector_store::{PayloadFilter, SearchHit, VectorPoint, VectorStoreProvider};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionDocument {
    dimension: usize,
    points: HashMap<ChunkId, VectorPoint>,
}

/// Stores each collection as `<state_dir>/vectors-<collection>.json`.
/// Reads happen lazily; writes are persisted after every mutating call so
/// the store never holds data the state file can't account for.
pub struct FilesystemVectorStore {
    state_dir: PathBuf,
    collections: RwLock<HashMap<String, CollectionDocument>>,
}

impl FilesystemVectorStore {
    /// Open (without yet reading) a store rooted at `state_dir`.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into(), collections: RwLock::new(HashMap::new()) }
    }

    fn path_for(&self, collection: &str) -> PathBuf {
        self.state_dir.join(format!("vectors-{collection}.json"))
    }

    fn load(&self, collection: &str) -> Result<()> {
        {
            let guard = self.collections.read().expect("vector store lock poisoned");
            if guard.contains_key(collection) {
                return Ok(());
            }
        }
        let path = self.path_for(collection);
        let document = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            CollectionDocument::default()
        };
        self.collections.write().expect("vector store lock poisoned").insert(collection.to_string(), document);
        Ok(())
    }

    fn persist(&self, collection: &str) -> Result<()> {
        let guard = self.collections.read().expect("vector store lock poisoned");
        let Some(document) = guard.get(collection) else { return Ok(()) };
        let serialized = serde_json::to_vec_pretty(document)?;
        write_atomic(&self.path_for(collection), &serialized)
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
impl VectorStoreProvider for FilesystemVectorStore {
    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        self.load(collection)?;
        let mut guard = self.collections.write().expect("vector store lock poisoned");
        let document = guard.entry(collection.to_string()).or_default();
        if document.points.is_empty() && document.dimension == 0 {
            document.dimension = dimension;
        } else if document.dimension != dimension {
            return Err(crate::domain::IndexError::collection(format!(
                "collection {collection} already exists with dimension {}, got {dimension}",
                document.dimension
            )));
        }
        drop(guard);
        self.persist(collection)
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()> {
        self.load(collection)?;
        {
            let mut guard = self.collections.write().expect("vector store lock poisoned");
            let document = guard
                .get_mut(collection)
                .ok_or_else(|| crate::domain::IndexError::collection(format!("collection {collection} does not exist")))?;
            for point in points {
                if point.vector.len() != document.dimension {
                    return Err(crate::domain::IndexError::collection(format!(
                        "point {} has dimension {}, collection expects {}",
                        point.id,
                        point.vector.len(),
                        document.dimension
                    )));
                }
                document.points.insert(point.id.clone(), point);
            }
        }
        self.persist(collection)
    }

    async fn delete_by_ids(&self, collection: &str, ids: &[ChunkId]) -> Result<()> {
        self.load(collection)?;
        {
            let mut guard = self.collections.write().expect("vector store lock poisoned");
            if let Some(document) = guard.get_mut(collection) {
                for id in ids {
                    document.points.remove(id);
                }
            }
        }
        self.persist(collection)
    }

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<usize> {
        self.load(collection)?;
        let removed = {
            let mut guard = self.collections.write().expect("vector store lock poisoned");
            let Some(document) = guard.get_mut(collection) else { return Ok(0) };
            let to_remove: Vec<ChunkId> = document.points.values().filter(|p| filter.matches(&p.payload)).map(|p| p.id.clone()).collect();
            for id in &to_remove {
                document.points.remove(id);
            }
            to_remove.len()
        };
        self.persist(collection)?;
        Ok(removed)
    }

    async fn scroll(&self, collection: &str, filter: &PayloadFilter) -> Result<Vec<VectorPoint>> {
        self.load(collection)?;
        let guard = self.collections.read().expect("vector store lock poisoned");
        Ok(guard.get(collection).map(|d| d.points.values().filter(|p| filter.matches(&p.payload)).cloned().collect()).unwrap_or_default())
    }

    async fn search(&self, collection: &str, query_vector: &[f32], limit: usize, filter: Option<&PayloadFilter>) -> Result<Vec<SearchHit>> {
        self.load(collection)?;
        let guard = self.collections.read().expect("vector store lock poisoned");
        let Some(document) = guard.get(collection) else { return Ok(Vec::new()) };
        let mut hits: Vec<SearchHit> = document
            .points
            .values()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload)))
            .map(|p| SearchHit { id: p.id.clone(), score: cosine_similarity(query_vector, &p.vector), payload: p.payload.clone() })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Default state directory name under a project root, shared with the
/// state store (C4) so both land under one `.semantic-index/` directory.
pub fn default_state_dir(project_root: &Path) -> PathBuf {
    project_root.join(".semantic-index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkKind, ChunkPayload};

    fn point(id: &str, vector: Vec<f32>) -> VectorPoint {
        VectorPoint {
            id: ChunkId::new("a.rs", id, ChunkKind::Metadata, "1"),
            vector,
            payload: ChunkPayload {
                chunk_kind: ChunkKind::Metadata,
                entity_name: id.to_string(),
                entity_kind: "function".to_string(),
                file_path: Some("a.rs".to_string()),
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
    async fn persists_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FilesystemVectorStore::new(dir.path());
            store.ensure_collection("demo", 2).await.unwrap();
            store.upsert("demo", vec![point("foo", vec![1.0, 0.0])]).await.unwrap();
        }
        let reopened = FilesystemVectorStore::new(dir.path());
        let points = reopened.scroll("demo", &PayloadFilter::all()).await.unwrap();
        assert_eq!(points.len(), 1);
    }
}
