//! Source language identification and routing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A source language or file family the indexer knows how to route to a
/// parser (C2/C3). Unknown extensions fall back to [`Language::PlainText`]
/// which the text-window chunker handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// `.rs`
    Rust,
    /// `.py`, `.pyi`
    Python,
    /// `.js`, `.jsx`, `.mjs`, `.cjs`
    JavaScript,
    /// `.ts`, `.tsx`, `.mts`, `.cts`
    TypeScript,
    /// `.md`, `.markdown`
    Markdown,
    /// `.json`
    Json,
    /// `.yaml`, `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// Anything else routed to the N-line-window fallback chunker.
    PlainText,
}

impl Language {
    /// Determine a language from a file extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyi" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Self::TypeScript,
            "md" | "markdown" => Self::Markdown,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            _ => Self::PlainText,
        }
    }

    /// Determine a language from a file path by inspecting its extension.
    pub fn from_path(path: &str) -> Self {
        match std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::from_extension(ext),
            None => Self::PlainText,
        }
    }

    /// Stable lowercase identifier, used in config keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::PlainText => "plain_text",
        }
    }

    /// Whether this language has a tree-sitter grammar wired up (C2),
    /// versus falling back to regex/brace chunking or line windows (C3).
    pub fn has_ast_parser(&self) -> bool {
        matches!(self, Self::Rust | Self::Python | Self::JavaScript | Self::TypeScript)
    }

    /// Whether this is one of the structured-data formats handled by
    /// serde-based whole-document chunking rather than line windows.
    pub fn is_structured_data(&self) -> bool {
        matches!(self, Self::Json | Self::Yaml | Self::Toml)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "rust" => Self::Rust,
            "python" => Self::Python,
            "javascript" => Self::JavaScript,
            "typescript" => Self::TypeScript,
            "markdown" => Self::Markdown,
            "json" => Self::Json,
            "yaml" => Self::Yaml,
            "toml" => Self::Toml,
            _ => Self::PlainText,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_extensions() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("PY"), Language::Python);
        assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
        assert_eq!(Language::from_extension("yml"), Language::Yaml);
    }

    #[test]
    fn unknown_extension_is_plain_text() {
        assert_eq!(Language::from_extension("xyz"), Language::PlainText);
    }

    #[test]
    fn from_path_reads_extension() {
        assert_eq!(Language::from_path("src/lib.rs"), Language::Rust);
        assert_eq!(Language::from_path("README"), Language::PlainText);
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        for lang in [
            Language::Rust,
            Language::Python,
            Language::JavaScript,
            Language::TypeScript,
            Language::Markdown,
            Language::Json,
            Language::Yaml,
            Language::Toml,
            Language::PlainText,
        ] {
            let rendered = lang.to_string();
            assert_eq!(Language::from_str(&rendered).unwrap(), lang);
        }
    }
}
