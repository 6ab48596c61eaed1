//! Extractor for Markdown documentation.
//!
//! Headers become `DocumentationSection` entities nested by heading level,
//! fenced code blocks are chunked with their language tag attached, and
//! Markdown links are recorded as `Imports` relations (the closest
//! existing relation kind to "this document references that target").

use std::time::Instant;

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser as MarkdownParser, Tag, TagEnd};

use super::common::contains;
use crate::adapters::parsers::common::ChunkBuilder;
use crate::domain::{Entity, EntityCollector, EntityKind, Language, ParserResult, Relation, RelationKind};
use crate::ports::parser::LanguageParser as LanguageParserTrait;

/// Extracts headers, fenced code blocks, and links from Markdown source.
#[derive(Default)]
pub struct MarkdownParserAdapter;

impl MarkdownParserAdapter {
    /// Construct a new parser instance. Stateless; safe to share.
    pub fn new() -> Self {
        Self
    }
}

struct OpenHeading {
    level: u8,
    name: String,
    start_line: u32,
    /// Body text accumulated between this heading and its next sibling
    /// or child, kept separate per level so closing several nested
    /// headings at once (a new H1 after an H1 > H2 > H3 chain) doesn't
    /// smear one heading's paragraph text across its ancestors.
    body: String,
}

impl LanguageParserTrait for MarkdownParserAdapter {
    fn parse(&self, file_path: &str, content: &str) -> ParserResult {
        let started = Instant::now();
        let builder = ChunkBuilder::new(file_path, content);
        let mut collector = EntityCollector::new();

        let file_entity = builder.entity(file_path, EntityKind::File, 1, content.lines().count().max(1) as u32, vec![], "markdown_document");
        let file_chunk = builder.metadata_only_chunk(&file_entity, file_path, format!("file: {file_path}"), 1);
        collector.chunks.push(file_chunk);
        collector.entities.push(file_entity);

        let mut stack: Vec<OpenHeading> = Vec::new();
        let mut heading_title = String::new();
        let mut in_heading = false;
        let mut in_code_block = false;
        let mut code_lang = String::new();
        let mut code_text = String::new();
        let mut code_start_line = 0u32;

        let offset_line = |byte_offset: usize| content[..byte_offset.min(content.len())].matches('\n').count() as u32 + 1;

        let parser = MarkdownParser::new_ext(content, Options::ENABLE_TABLES);
        let mut events_with_offsets = Vec::new();
        for (event, range) in parser.into_offset_iter() {
            events_with_offsets.push((event, range.start));
        }

        for (event, byte_offset) in events_with_offsets {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let line = offset_line(byte_offset);
                    close_headings_at_or_above(&mut stack, heading_level_to_u8(level), &builder, file_path, &mut collector);
                    stack.push(OpenHeading { level: heading_level_to_u8(level), name: String::new(), start_line: line, body: String::new() });
                    in_heading = true;
                    heading_title.clear();
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(open) = stack.last_mut() {
                        open.name = heading_title.trim().to_string();
                    }
                    heading_title.clear();
                    in_heading = false;
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_lang = match kind {
                        pulldown_cmark::CodeBlockKind::Fenced(lang) => lang.to_string(),
                        pulldown_cmark::CodeBlockKind::Indented => String::new(),
                    };
                    code_start_line = offset_line(byte_offset);
                    code_text.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    emit_code_block(&builder, file_path, &scope_name(&stack), &code_lang, &code_text, code_start_line, &mut collector);
                }
                Event::Text(text) | Event::Code(text) => {
                    if in_code_block {
                        code_text.push_str(&text);
                    } else if in_heading {
                        heading_title.push_str(&text);
                    } else if let Some(open) = stack.last_mut() {
                        open.body.push_str(&text);
                    }
                }
                Event::Start(Tag::Link { dest_url, .. }) => {
                    record_link(&stack, file_path, &dest_url, &mut collector);
                }
                Event::SoftBreak | Event::HardBreak => {
                    if in_heading {
                        heading_title.push(' ');
                    } else if let Some(open) = stack.last_mut() {
                        open.body.push('\n');
                    }
                }
                _ => {}
            }
        }
        close_headings_at_or_above(&mut stack, 0, &builder, file_path, &mut collector);

        let mut chunks = collector.chunks;
        chunks.extend(super::common::relation_chunks(&builder, &collector.relations));

        ParserResult {
            entities: collector.entities,
            relations: collector.relations,
            chunks,
            syntax_errors: Vec::new(),
            parse_duration: started.elapsed(),
        }
    }

    fn language(&self) -> Language {
        Language::Markdown
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn scope_name(stack: &[OpenHeading]) -> String {
    stack.last().map(|h| h.name.clone()).unwrap_or_default()
}

/// Finalize every open heading whose level is `>= new_level`, deepest
/// first, leaving shallower ancestors on the stack as the parent scope
/// for whichever heading is finalized next. A new heading at level `L`
/// can only nest under an ancestor strictly shallower than `L` — a
/// sibling or shallower heading closes everything at or below its own
/// level. Passing `0` (no real heading has that level) closes the whole
/// stack, used once at end of document.
fn close_headings_at_or_above(stack: &mut Vec<OpenHeading>, new_level: u8, builder: &ChunkBuilder, file_path: &str, collector: &mut EntityCollector) {
    while stack.last().is_some_and(|open| open.level >= new_level) {
        let open = stack.pop().expect("checked by while condition");
        if open.name.is_empty() {
            continue;
        }
        let parent_scope = stack.last().map(|h| h.name.as_str()).unwrap_or("");
        let qualified = Entity::qualify(parent_scope, &open.name);
        let observations = vec![format!("h{} {}", open.level, open.name), open.body.trim().to_string()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        let entity = builder.entity(&qualified, EntityKind::DocumentationSection, open.start_line, open.start_line, observations.clone(), "heading");
        let chunk = builder.metadata_only_chunk(&entity, &qualified, observations.join("\n"), open.start_line);
        collector.chunks.push(chunk);
        collector.entities.push(entity);
        collector.relations.push(contains(if parent_scope.is_empty() { file_path } else { parent_scope }, &qualified));
    }
}

fn emit_code_block(builder: &ChunkBuilder, file_path: &str, scope: &str, lang: &str, text: &str, start_line: u32, collector: &mut EntityCollector) {
    if text.trim().is_empty() {
        return;
    }
    let qualified = format!("{}#code@{start_line}", if scope.is_empty() { file_path } else { scope });
    let end_line = start_line + text.lines().count() as u32;
    let observations = vec![format!("```{lang}")];
    let entity = builder.entity(&qualified, EntityKind::DocumentationSection, start_line, end_line, observations, "fenced_code_block");
    let [meta, implementation] = builder.chunk_pair(&entity, &qualified, format!("```{lang}"), text.to_string(), start_line);
    collector.chunks.push(meta);
    collector.chunks.push(implementation);
    collector.entities.push(entity);
    collector.relations.push(contains(if scope.is_empty() { file_path } else { scope }, &qualified));
}

/// A link is "internal" (a relative path into this project, not a
/// scheme-qualified URL) iff it produces an `Imports` relation per
/// `SPEC_FULL.md` §4.2; anything else (an external `http(s)://` link, a
/// mailto:, an anchor-only `#fragment`) is recorded as `DocumentsLink`
/// instead, since it names no importable path.
fn is_internal_link(dest: &str) -> bool {
    !dest.contains("://") && !dest.starts_with('#') && !dest.starts_with("mailto:")
}

fn record_link(stack: &[OpenHeading], file_path: &str, dest: &CowStr, collector: &mut EntityCollector) {
    let from = stack.last().map(|h| h.name.clone()).filter(|n| !n.is_empty()).unwrap_or_else(|| file_path.to_string());
    let kind = if is_internal_link(dest) { RelationKind::Imports } else { RelationKind::DocumentsLink };
    collector.relations.push(Relation { from_name: from, to_name: dest.to_string(), relation_kind: kind, context: String::new() });
}
