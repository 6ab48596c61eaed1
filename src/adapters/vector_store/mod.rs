//! Vector store implementations (C6).
//!
//! A production remote store (Milvus/Qdrant-style) is intentionally not
//! implemented here — the network vector database is the external
//! collaborator per `SPEC_FULL.md` §1 — but [`VectorStoreProvider`] is
//! shaped so one could be added without touching the indexer core.

pub mod filesystem;
pub mod in_memory;

pub use filesystem::FilesystemVectorStore;
pub use in_memory::InMemoryVectorStore;

pub use crate::ports::vector_store::VectorStoreProvider;
