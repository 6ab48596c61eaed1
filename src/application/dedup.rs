//! Unified Chunk Processor (C9): pre-embedding deduplication by exact
//! content hash. One vector is embedded per unique content; every other
//! chunk sharing that content gets its payload's `aliases` field pointed
//! at the chunk that owns the embedding, instead of paying to re-embed
//! identical text. Pure optimization — it changes nothing about which
//! chunks exist, only how many distinct embedder calls are made.

use std::collections::HashMap;

use crate::adapters::parsers::common::content_hash;
use crate::domain::Chunk;

/// One group of chunks sharing identical content.
struct DedupGroup {
    owner_index: usize,
    alias_indices: Vec<usize>,
}

/// Result of deduplicating a batch of chunks before embedding.
pub struct DedupPlan {
    /// Indices into the original `chunks` slice that must be embedded.
    pub unique_indices: Vec<usize>,
    /// Maps an aliased chunk's index to the index of the chunk whose
    /// vector it should reuse.
    pub alias_to_owner: HashMap<usize, usize>,
}

/// Build a dedup plan for `chunks`, grouping by exact content hash.
/// Chunks with empty content are never deduplicated against each other
/// (an empty Metadata-only entity and another would otherwise collapse
/// to one vector, which is surprising rather than useful).
pub fn plan_deduplication(chunks: &[Chunk]) -> DedupPlan {
    let mut groups: HashMap<String, DedupGroup> = HashMap::new();
    let mut unique_indices = Vec::new();
    let mut alias_to_owner = HashMap::new();

    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.content.trim().is_empty() {
            unique_indices.push(index);
            continue;
        }
        let hash = content_hash(&chunk.content);
        match groups.get_mut(&hash) {
            Some(group) => {
                group.alias_indices.push(index);
                alias_to_owner.insert(index, group.owner_index);
            }
            None => {
                groups.insert(hash, DedupGroup { owner_index: index, alias_indices: Vec::new() });
                unique_indices.push(index);
            }
        }
    }

    DedupPlan { unique_indices, alias_to_owner }
}

/// Tokens saved by not re-embedding aliased chunks, given a simple
/// whitespace-token estimate per chunk — used only for the report's
/// `chunks_deduplicated` accounting, not for billing.
pub fn count_deduplicated(plan: &DedupPlan) -> usize {
    plan.alias_to_owner.len()
}
