//! N-line-window fallback chunker for plain text, logs, and any
//! recognized-but-unimplemented language (`SPEC_FULL.md` §3 ADDED note).
//!
//! This is also the parser every unrecognized extension that the registry
//! chooses to route through rather than silently drop lands on, when a
//! project explicitly opts into "chunk everything" behavior; by default
//! the registry (C3) still drops genuinely unknown extensions per
//! spec.md's unchanged rule, and only recognized-but-unimplemented
//! languages are routed here.

use std::time::Instant;

use super::common::contains;
use crate::adapters::parsers::common::ChunkBuilder;
use crate::domain::{EntityKind, Language, ParserResult};
use crate::ports::parser::LanguageParser;

/// Default window size in lines, per `SPEC_FULL.md` §4.2.
pub const DEFAULT_WINDOW_LINES: usize = 50;

/// Splits a file into fixed-size, non-overlapping line windows, each a
/// Metadata-only `DocumentationSection` entity.
pub struct TextWindowParser {
    window_lines: usize,
}

impl TextWindowParser {
    /// A parser using the default window size.
    pub fn new() -> Self {
        Self { window_lines: DEFAULT_WINDOW_LINES }
    }

    /// A parser with a caller-specified window size (from project config).
    pub fn with_window(window_lines: usize) -> Self {
        Self { window_lines: window_lines.max(1) }
    }
}

impl Default for TextWindowParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for TextWindowParser {
    fn parse(&self, file_path: &str, content: &str) -> ParserResult {
        let started = Instant::now();
        let builder = ChunkBuilder::new(file_path, content);
        let mut entities = Vec::new();
        let mut relations = Vec::new();
        let mut chunks = Vec::new();

        let lines: Vec<&str> = content.lines().collect();
        let file_entity = builder.entity(file_path, EntityKind::File, 1, lines.len().max(1) as u32, vec![], "text_file");
        let file_chunk = builder.metadata_only_chunk(&file_entity, file_path, format!("file: {file_path}"), 1);
        chunks.push(file_chunk);
        entities.push(file_entity);

        for (window_index, window) in lines.chunks(self.window_lines).enumerate() {
            let start_line = (window_index * self.window_lines) as u32 + 1;
            let end_line = start_line + window.len() as u32 - 1;
            let text = window.join("\n");
            if text.trim().is_empty() {
                continue;
            }
            let qualified = format!("{file_path}#window@{start_line}");
            let entity = builder.entity(&qualified, EntityKind::DocumentationSection, start_line, end_line, vec![], "line_window");
            let chunk = builder.metadata_only_chunk(&entity, &qualified, text, start_line);
            relations.push(contains(file_path, &qualified));
            chunks.push(chunk);
            entities.push(entity);
        }

        chunks.extend(super::common::relation_chunks(&builder, &relations));

        ParserResult { entities, relations, chunks, syntax_errors: Vec::new(), parse_duration: started.elapsed() }
    }

    fn language(&self) -> Language {
        Language::PlainText
    }
}
