//! Domain types: the vocabulary shared by every layer of the indexer.
//!
//! Nothing in this module depends on tokio, the filesystem, or any
//! specific embedding/vector-store backend — it is the pure core the
//! ports (`crate::ports`) and adapters (`crate::adapters`) build on.

pub mod entity;
pub mod error;
pub mod language;

pub use entity::{
    AutomationMarkers, Chunk, ChunkId, ChunkKind, ChunkPayload, Entity, EntityCollector, EntityKind, Origin,
    ParserResult, Relation, RelationKind,
};
pub use error::{IndexError, Result};
pub use language::Language;
