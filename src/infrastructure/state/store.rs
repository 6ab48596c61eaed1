//! Per-collection state store (C4): an ordered `file_path -> {sha256,
//! last_indexed_at, chunk_ids[]}` map persisted as one JSON document,
//! written atomically so a crash mid-write never corrupts it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ChunkId, Result};
use crate::infrastructure::atomic_file::write_atomic;

/// Everything the indexer remembers about one previously indexed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileState {
    /// SHA-256 of the file's content as of the last successful index.
    pub sha256: String,
    /// RFC 3339 timestamp of the last successful index of this file.
    pub last_indexed_at: String,
    /// Every chunk id produced from this file, so a modified file's prior
    /// chunks can be deleted precisely rather than via a wildcard filter.
    pub chunk_ids: Vec<ChunkId>,
}

/// The full persisted state for one collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
    /// Format version, bumped on breaking changes to this document's shape.
    pub version: u32,
    /// Ordered (`BTreeMap`) so the serialized file has a stable diff.
    pub files: BTreeMap<String, FileState>,
}

/// Current state file format version.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Loads, mutates in memory, and atomically persists a collection's
/// [`StateDocument`].
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Open a store at `<project_root>/.semantic-index/state-<collection>.json`.
    pub fn for_collection(project_root: &Path, collection: &str) -> Self {
        Self { path: project_root.join(".semantic-index").join(format!("state-{collection}.json")) }
    }

    /// Load the document, or an empty one if the file does not exist yet.
    pub fn load(&self) -> Result<StateDocument> {
        if !self.path.exists() {
            return Ok(StateDocument { version: STATE_FORMAT_VERSION, files: BTreeMap::new() });
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let document: StateDocument = serde_json::from_str(&raw)?;
        Ok(document)
    }

    /// Persist `document` atomically.
    pub fn save(&self, document: &StateDocument) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(document)?;
        write_atomic(&self.path, &serialized)
    }

    /// Path to the underlying JSON document, for diagnostics and the
    /// advisory lock sibling file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChunkKind;

    #[test]
    fn load_missing_file_yields_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::for_collection(dir.path(), "default");
        let document = store.load().unwrap();
        assert!(document.files.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::for_collection(dir.path(), "default");
        let mut document = store.load().unwrap();
        document.files.insert(
            "src/lib.rs".to_string(),
            FileState {
                sha256: "abc".to_string(),
                last_indexed_at: "2026-01-01T00:00:00Z".to_string(),
                chunk_ids: vec![ChunkId::new("src/lib.rs", "foo", ChunkKind::Metadata, "1")],
            },
        );
        store.save(&document).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.files.len(), 1);
        assert_eq!(reloaded.files["src/lib.rs"].sha256, "abc");
    }
}
