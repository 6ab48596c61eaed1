//! Orphaned relation garbage collection (C7 §4.7.3).
//!
//! Liveness is membership in the current run's Metadata-chunk-id set —
//! not graph reachability, per `SPEC_FULL.md` §9: a Relation chunk
//! referencing an entity whose Metadata chunk no longer exists this run
//! is orphaned and removed, regardless of whether some other entity still
//! points at it.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::domain::{ChunkId, ChunkKind};
use crate::ports::vector_store::{PayloadFilter, VectorStoreProvider};
use crate::domain::Result;

/// Scroll every point in `collection`, and delete the Relation chunks
/// whose `from`/`to` endpoint is not present in `live_entity_names` (the
/// set of entity qualified names with a surviving Metadata chunk this
/// run). Returns the number of points removed.
#[instrument(skip(store, live_entity_names), fields(live = live_entity_names.len()))]
pub async fn collect_orphans(
    store: &dyn VectorStoreProvider,
    collection: &str,
    live_entity_names: &HashSet<String>,
) -> Result<usize> {
    let relation_filter = PayloadFilter { file_path: None, chunk_kind: Some(ChunkKind::Relation) };
    let relations = store.scroll(collection, &relation_filter).await?;

    let orphan_ids: Vec<ChunkId> = relations
        .into_iter()
        .filter(|point| {
            let from_alive = point.payload.from.as_deref().is_some_and(|f| live_entity_names.contains(f));
            let to_alive = point.payload.to.as_deref().is_some_and(|t| live_entity_names.contains(t));
            !(from_alive && to_alive)
        })
        .map(|point| point.id)
        .collect();

    let removed = orphan_ids.len();
    if !orphan_ids.is_empty() {
        store.delete_by_ids(collection, &orphan_ids).await?;
    }
    debug!(removed, "orphan relation gc complete");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::vector_store::InMemoryVectorStore;
    use crate::domain::{ChunkId as Id, ChunkPayload};
    use crate::ports::vector_store::VectorPoint;

    fn relation_point(id: &str, from: &str, to: &str) -> VectorPoint {
        VectorPoint {
            id: Id::new("rel.rs", id, ChunkKind::Relation, "1"),
            vector: vec![0.1],
            payload: ChunkPayload {
                chunk_kind: ChunkKind::Relation,
                entity_name: id.to_string(),
                entity_kind: String::new(),
                file_path: None,
                start_line: None,
                end_line: None,
                has_implementation: None,
                source_hash: None,
                parsed_at: None,
                observations: vec![],
                relation_kind: Some("calls".to_string()),
                from: Some(from.to_string()),
                to: Some(to.to_string()),
                aliases: None,
            },
        }
    }

    #[tokio::test]
    async fn removes_relations_whose_endpoint_is_gone() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("demo", 1).await.unwrap();
        store
            .upsert("demo", vec![relation_point("r1->r2", "alive_fn", "gone_fn"), relation_point("r1->r3", "alive_fn", "also_alive")])
            .await
            .unwrap();

        let live: std::collections::HashSet<String> = ["alive_fn".to_string(), "also_alive".to_string()].into_iter().collect();
        let removed = collect_orphans(&store, "demo", &live).await.unwrap();

        assert_eq!(removed, 1);
        let remaining = store.scroll("demo", &PayloadFilter::all()).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn keeps_relations_whose_both_endpoints_are_alive() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("demo", 1).await.unwrap();
        store.upsert("demo", vec![relation_point("r1->r2", "a", "b")]).await.unwrap();

        let live: std::collections::HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let removed = collect_orphans(&store, "demo", &live).await.unwrap();

        assert_eq!(removed, 0);
    }
}
