//! `IndexReport`: what a run returns and what the CLI (C11) prints.

use serde::{Deserialize, Serialize};

/// Which mode an index run was invoked with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexMode {
    /// Clear the collection (per `clearing_policy`) and reparse every file.
    FullRebuild,
    /// Diff discovered files against the state store; parse only the delta.
    Incremental,
    /// Re-index exactly one file, used by the watcher (C8).
    SingleFile(String),
}

/// How a `FullRebuild` should treat existing points before reparsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearingPolicy {
    /// Leave existing points in place; rely on upserts to overwrite them.
    None,
    /// Delete only points whose payload marks them auto-indexed.
    PreserveManual,
    /// Delete every point in the collection before reparsing.
    ClearAll,
}

/// One file's outcome within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Project-relative path.
    pub path: String,
    /// What happened to it.
    pub status: FileStatus,
}

/// The four things that can happen to a discovered file in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// New since the last run (or first run).
    Added,
    /// Content hash differs from the recorded one.
    Modified,
    /// Present in state but no longer discovered.
    Deleted,
    /// Hash unchanged; skipped.
    Unchanged,
    /// Parsed, but embedding/upsert failed; recorded in `errors`.
    Failed,
}

/// A single non-fatal error recorded for one file, per the per-file
/// error-handling tier (`SPEC_FULL.md` §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    /// Project-relative path of the offending file.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

/// Summary returned by every `index()` call, and the CLI's sole output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexReport {
    /// Collection this run targeted.
    pub collection: String,
    /// Per-file outcomes, one entry per discovered or removed file.
    pub files: Vec<FileOutcome>,
    /// Non-fatal errors collected along the way; a nonempty list is what
    /// the external-interfaces contract (§6) maps to a nonzero exit code.
    pub errors: Vec<FileError>,
    /// Total chunks upserted this run.
    pub chunks_upserted: usize,
    /// Total chunks deleted this run (modified/deleted files plus GC).
    pub chunks_deleted: usize,
    /// Orphaned relation chunks removed by garbage collection.
    pub relations_garbage_collected: usize,
    /// Chunks whose content hash matched an already-embedded chunk this
    /// run, and so were aliased instead of re-embedded (C9).
    pub chunks_deduplicated: usize,
    /// Total input tokens sent to the embedder.
    pub tokens_embedded: u64,
    /// Aggregate embedder cost, if the provider reports one.
    pub cost_usd: f64,
    /// Wall-clock duration of the run, in milliseconds.
    pub duration_ms: u64,
    /// Set when the run was cancelled mid-flight; state is left
    /// unchanged and the report reflects only what completed before
    /// cancellation, per §5's cancellation semantics.
    pub aborted: bool,
}

impl IndexReport {
    /// A fresh, empty report for `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), ..Default::default() }
    }

    /// Whether the run should be considered successful for the external
    /// exit-condition contract: zero iff `errors` is empty.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
