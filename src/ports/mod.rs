//! Trait boundaries between the domain/orchestration core and the
//! adapters that implement parsing, embedding, and vector storage.
//!
//! Mirrors the teacher's `domain::ports` split: one file per
//! collaborator, re-exported flat here for ergonomic `use crate::ports::*`.

pub mod embedding;
pub mod parser;
pub mod vector_store;

pub use embedding::{EmbeddingProvider, EmbeddingResult};
pub use parser::LanguageParser;
pub use vector_store::{PayloadFilter, SearchHit, VectorPoint, VectorStoreProvider};
