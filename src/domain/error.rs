//! Error taxonomy for the indexing pipeline
//!
//! Mirrors the transient / per-file / per-collection / fatal split the
//! orchestrator relies on to decide whether to retry, skip-and-continue,
//! or abort a run.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors produced by the indexing pipeline.
///
/// The variant groups line up with the error taxonomy in the design doc:
/// transient errors are retried by the caller, per-file errors are
/// recorded in [`crate::application::report::IndexReport`] without
/// aborting the run, per-collection errors abort the run with state left
/// unchanged, and [`IndexError::Fatal`] indicates a broken invariant that
/// must never be reachable from correct code.
#[derive(Error, Debug)]
pub enum IndexError {
    /// I/O failure reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure, typically on the state file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failure in a structured-data parser.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration was invalid or referenced an unknown key.
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable description.
        message: String,
    },

    /// A single file failed to parse, embed, or upsert. Recorded and
    /// skipped; the file's state entry is not advanced.
    #[error("failed to index {path}: {reason}")]
    PerFile {
        /// Project-relative path of the offending file.
        path: String,
        /// Why the file could not be indexed.
        reason: String,
    },

    /// A transient failure from the embedder or vector store that the
    /// caller should retry (rate limit, connection reset, timeout).
    #[error("transient error from {source_name}: {message}")]
    Transient {
        /// Name of the collaborator that raised the error (embedder, store).
        source_name: String,
        /// Description of the failure.
        message: String,
    },

    /// A failure that must abort the whole run: dimension mismatch, auth
    /// failure, corrupt state file, or advisory-lock contention.
    #[error("collection error: {message}")]
    Collection {
        /// Description of the failure.
        message: String,
    },

    /// An internal invariant was violated (e.g. a chunk id collision
    /// survived deduplication). Never expected in a correct build; its
    /// presence indicates a bug, not a runtime condition to recover from.
    #[error("internal invariant violated: {message}")]
    Fatal {
        /// Description of the violated invariant.
        message: String,
    },
}

impl IndexError {
    /// Build a [`IndexError::PerFile`] error.
    pub fn per_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PerFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`IndexError::Transient`] error.
    pub fn transient(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Build a [`IndexError::Collection`] error.
    pub fn collection(message: impl Into<String>) -> Self {
        Self::Collection {
            message: message.into(),
        }
    }

    /// Build a [`IndexError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Build a [`IndexError::Fatal`] error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Whether this error class should be retried by the embedder/store
    /// caller rather than surfaced immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<config::ConfigError> for IndexError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for IndexError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
