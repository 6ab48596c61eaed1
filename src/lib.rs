//! Incremental semantic code indexer.
//!
//! Parses a source tree into a progressive-disclosure chunk model
//! (Metadata, Implementation, Relation chunks sharing a stable identity)
//! and keeps a vector store in sync with it, incrementally, as files
//! change. See `domain` for the core vocabulary, `ports` for the trait
//! boundaries adapters implement, and `application::indexer` for the
//! orchestration entry point.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod ports;
