//! Project configuration types (C10).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Per-project include/exclude patterns and parser options merged over
/// global defaults. Recognized keys, per `SPEC_FULL.md` §4.10:
/// `include_patterns`, `exclude_patterns`, `max_file_size`,
/// `debounce_seconds`, `parser_config.<language>.<option>`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Glob patterns a discovered file's relative path must match at
    /// least one of to be indexed.
    pub include_patterns: Vec<String>,
    /// Glob patterns that exclude an otherwise-included file.
    pub exclude_patterns: Vec<String>,
    /// Files larger than this many bytes are skipped entirely.
    #[validate(range(min = 1))]
    pub max_file_size: u64,
    /// Seconds the watcher waits after the last event on a path before
    /// re-indexing it.
    #[validate(range(min = 0.0))]
    pub debounce_seconds: f64,
    /// Nested per-language parser options
    /// (`parser_config.<language>.<option>`), e.g. the text-window
    /// chunker's line count.
    #[serde(default)]
    pub parser_config: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*".to_string()],
            exclude_patterns: vec!["**/.git/**".to_string(), "**/target/**".to_string(), "**/node_modules/**".to_string()],
            max_file_size: 5 * 1024 * 1024,
            debounce_seconds: 2.0,
            parser_config: BTreeMap::new(),
        }
    }
}

impl ProjectConfig {
    /// Read `parser_config.<language>.window_lines` if present, falling
    /// back to the text-window parser's own default.
    pub fn window_lines_for(&self, language: &str) -> usize {
        self.parser_config
            .get(language)
            .and_then(|opts| opts.get("window_lines"))
            .and_then(|v| v.as_integer())
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(crate::adapters::parsers::text_window::DEFAULT_WINDOW_LINES)
    }
}

/// Top-level configuration aggregate, one layer of which is always the
/// embedded defaults (`config/default.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default collection name used when a caller doesn't specify one.
    pub default_collection: String,
    /// Project-level settings, validated as a nested struct.
    #[validate(nested)]
    pub project: ProjectConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self { default_collection: "default".to_string(), project: ProjectConfig::default() }
    }
}
