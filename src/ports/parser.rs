//! The parser contract (C2/C3).

use crate::domain::{Language, ParserResult};

/// A language-specific extractor: pure with respect to a single file's
/// content, with no shared mutable state beyond whatever options it was
/// constructed with.
///
/// Implementations must never panic on malformed input — partial results
/// with populated `syntax_errors` are always preferred to aborting the
/// file, per `SPEC_FULL.md` §4.2.
pub trait LanguageParser: Send + Sync {
    /// Parse one file's content into entities, relations, and chunks.
    fn parse(&self, file_path: &str, content: &str) -> ParserResult;

    /// Which language this parser claims to handle; used by the registry
    /// (C3) for diagnostics, not for dispatch (dispatch is by extension).
    fn language(&self) -> Language;
}
