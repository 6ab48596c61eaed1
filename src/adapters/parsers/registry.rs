//! Parser registry (C3): extension → parser map.
//!
//! Grounded in the teacher's `LANGUAGE_PROCESSORS`/`LANGUAGE_CONFIGS`
//! static-map pattern, but constructed explicitly with project config
//! rather than a `LazyLock` global — per `SPEC_FULL.md` §9's "constructed
//! with explicit config, no globals" design note.

use std::collections::HashMap;

use crate::domain::Language;
use crate::ports::parser::LanguageParser;

use super::javascript::JavaScriptParser;
use super::markdown::MarkdownParserAdapter;
use super::python::PythonParser;
use super::rust::RustParser;
use super::structured_data::{StructuredDataParser, StructuredFormat};
use super::text_window::TextWindowParser;

/// Dispatches a file path to the [`LanguageParser`] registered for its
/// extension. Registration order matters only when a project config
/// explicitly re-registers an extension: last-registered wins, per
/// `SPEC_FULL.md` §4.3.
pub struct ParserRegistry {
    by_language: HashMap<Language, Box<dyn LanguageParser>>,
    fallback: Box<dyn LanguageParser>,
}

impl ParserRegistry {
    /// Build the default registry: Rust/Python/JS/TS via tree-sitter,
    /// Markdown via `pulldown-cmark`, JSON/YAML/TOML via serde, and every
    /// other [`Language`] variant (including [`Language::PlainText`])
    /// routed to the line-window fallback.
    pub fn with_defaults(window_lines: usize) -> Self {
        let mut by_language: HashMap<Language, Box<dyn LanguageParser>> = HashMap::new();
        by_language.insert(Language::Rust, Box::new(RustParser::new()));
        by_language.insert(Language::Python, Box::new(PythonParser::new()));
        by_language.insert(Language::JavaScript, Box::new(JavaScriptParser::new()));
        by_language.insert(Language::TypeScript, Box::new(JavaScriptParser::typescript()));
        by_language.insert(Language::Markdown, Box::new(MarkdownParserAdapter::new()));
        by_language.insert(Language::Json, Box::new(StructuredDataParser::new(StructuredFormat::Json)));
        by_language.insert(Language::Yaml, Box::new(StructuredDataParser::new(StructuredFormat::Yaml)));
        by_language.insert(Language::Toml, Box::new(StructuredDataParser::new(StructuredFormat::Toml)));

        Self { by_language, fallback: Box::new(TextWindowParser::with_window(window_lines)) }
    }

    /// Register (or replace) the parser used for a language. Last call
    /// wins, matching the registry's documented conflict rule.
    pub fn register(&mut self, language: Language, parser: Box<dyn LanguageParser>) {
        self.by_language.insert(language, parser);
    }

    /// Look up the parser for a file path's extension. Every recognized
    /// [`Language`] resolves to some parser (structured languages to
    /// their own extractor, everything else to the fallback); only a
    /// caller that chose not to route unrecognized extensions at all
    /// would see `None` here, which this registry never returns, matching
    /// the "no discovered file is ever silently unparsed" rule in
    /// `SPEC_FULL.md` §3. File discovery (C7) is what applies the
    /// separate "unknown extensions silently skipped" gate from §4.3,
    /// upstream of this lookup.
    pub fn resolve(&self, file_path: &str) -> &dyn LanguageParser {
        let language = Language::from_path(file_path);
        self.by_language.get(&language).map(|p| p.as_ref()).unwrap_or(self.fallback.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_rust_files_to_rust_parser() {
        let registry = ParserRegistry::with_defaults(50);
        let parser = registry.resolve("src/lib.rs");
        assert_eq!(parser.language(), Language::Rust);
    }

    #[test]
    fn resolves_unrecognized_extension_to_fallback() {
        let registry = ParserRegistry::with_defaults(50);
        let parser = registry.resolve("data.xyz");
        assert_eq!(parser.language(), Language::PlainText);
    }

    #[test]
    fn explicit_registration_overrides_default() {
        let mut registry = ParserRegistry::with_defaults(50);
        registry.register(Language::Rust, Box::new(TextWindowParser::with_window(10)));
        let parser = registry.resolve("src/lib.rs");
        assert_eq!(parser.language(), Language::PlainText);
    }
}
