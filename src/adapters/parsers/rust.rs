//! Tree-sitter-backed extractor for Rust source files.

use std::time::Instant;

use tree_sitter::{Node, Parser};

use super::common::{contains, ChunkBuilder};
use crate::domain::{EntityCollector, EntityKind, Language, ParserResult, RelationKind};
use crate::ports::parser::LanguageParser;

/// Extracts functions, structs, enums, traits, and impl blocks from Rust
/// source using the `tree-sitter-rust` grammar, falling back to an empty
/// result (not a panic) if the grammar rejects the file outright.
#[derive(Default)]
pub struct RustParser;

impl RustParser {
    /// Construct a new parser instance. Stateless; safe to share.
    pub fn new() -> Self {
        Self
    }
}

impl LanguageParser for RustParser {
    fn parse(&self, file_path: &str, content: &str) -> ParserResult {
        let started = Instant::now();
        let mut parser = Parser::new();
        let mut syntax_errors = Vec::new();

        if parser.set_language(&tree_sitter_rust::LANGUAGE.into()).is_err() {
            syntax_errors.push("failed to load tree-sitter-rust grammar".to_string());
            return ParserResult::empty(started.elapsed());
        }

        let Some(tree) = parser.parse(content, None) else {
            syntax_errors.push("tree-sitter-rust failed to produce a parse tree".to_string());
            return ParserResult::empty(started.elapsed());
        };

        if tree.root_node().has_error() {
            syntax_errors.push(format!("{file_path}: source contains syntax errors; partial results returned"));
        }

        let builder = ChunkBuilder::new(file_path, content);
        let mut collector = EntityCollector::new();

        let file_entity = builder.entity(file_path, EntityKind::File, 1, content.lines().count().max(1) as u32, vec![], "source_file");
        let file_chunk = builder.metadata_only_chunk(&file_entity, file_path, format!("file: {file_path}"), 1);
        collector.chunks.push(file_chunk);
        collector.entities.push(file_entity);

        walk(&tree.root_node(), content, file_path, "", &builder, &mut collector);

        let mut chunks = collector.chunks;
        chunks.extend(super::common::relation_chunks(&builder, &collector.relations));

        ParserResult {
            entities: collector.entities,
            relations: collector.relations,
            chunks,
            syntax_errors,
            parse_duration: started.elapsed(),
        }
    }

    fn language(&self) -> Language {
        Language::Rust
    }
}

fn walk(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_item" => extract_function(&child, source, file_path, scope, builder, collector),
            "struct_item" | "enum_item" | "trait_item" | "union_item" => {
                extract_type(&child, source, file_path, scope, builder, collector)
            }
            "impl_item" => extract_impl(&child, source, file_path, scope, builder, collector),
            "mod_item" => extract_mod(&child, source, file_path, scope, builder, collector),
            "use_declaration" => extract_use(&child, source, file_path, scope, builder, collector),
            _ => {}
        }
    }
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

fn field_name(node: &Node, source: &str) -> Option<String> {
    node.child_by_field_name("name").map(|n| node_text(&n, source).to_string())
}

/// Preceding `///`/`//!`/`/** */` comment lines, in document order, each
/// with its comment marker stripped.
fn doc_comment(node: &Node, source: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cursor = *node;
    while let Some(prev) = cursor.prev_sibling() {
        if prev.kind() != "line_comment" && prev.kind() != "block_comment" {
            break;
        }
        let text = node_text(&prev, source);
        if !(text.starts_with("///") || text.starts_with("//!") || text.starts_with("/**")) {
            break;
        }
        lines.push(text.trim_start_matches('/').trim_start_matches('!').trim_start_matches('*').trim().to_string());
        cursor = prev;
    }
    lines.reverse();
    lines
}

fn extract_function(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let Some(name) = field_name(node, source) else { return };
    let qualified = crate::domain::Entity::qualify(scope, &name);
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;

    let signature_end = node.child_by_field_name("body").map(|b| b.start_byte()).unwrap_or(node.end_byte());
    let signature = source[node.start_byte()..signature_end].trim().to_string();

    let mut observations = doc_comment(node, source);
    observations.insert(0, signature);

    let kind = if scope.is_empty() { EntityKind::Function } else { EntityKind::Method };
    let entity = builder.entity(&qualified, kind, start_line, end_line, observations, "function_item");
    let [meta, implementation] = builder.chunk_pair(&entity, &qualified, format!("{}\n{}", entity.observations.join("\n"), qualified), node_text(node, source).to_string(), start_line);
    collector.relations.push(contains(if scope.is_empty() { file_path } else { scope }, &qualified));
    collector.chunks.push(meta);
    collector.chunks.push(implementation);
    collector.entities.push(entity);
    collector.note_name(&qualified, start_line);

    extract_calls(node, source, &qualified, collector);
}

fn extract_calls(node: &Node, source: &str, caller: &str, collector: &mut EntityCollector) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "call_expression" {
            if let Some(func) = child.child_by_field_name("function") {
                let callee = node_text(&func, source).to_string();
                collector.relations.push(crate::domain::Relation {
                    from_name: caller.to_string(),
                    to_name: callee,
                    relation_kind: RelationKind::Calls,
                    context: format!("line {}", child.start_position().row + 1),
                });
            }
        }
        extract_calls(&child, source, caller, collector);
    }
}

fn extract_type(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let Some(name) = field_name(node, source) else { return };
    let qualified = crate::domain::Entity::qualify(scope, &name);
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;

    let mut observations = doc_comment(node, source);
    observations.insert(0, format!("{} {}", node.kind().trim_end_matches("_item"), name));

    let entity = builder.entity(&qualified, EntityKind::Class, start_line, end_line, observations, node.kind());
    let [meta, implementation] = builder.chunk_pair(&entity, &qualified, entity.observations.join("\n"), node_text(node, source).to_string(), start_line);
    collector.relations.push(contains(if scope.is_empty() { file_path } else { scope }, &qualified));
    collector.chunks.push(meta);
    collector.chunks.push(implementation);
    collector.entities.push(entity);
    collector.note_name(&qualified, start_line);
}

fn extract_impl(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let Some(type_node) = node.child_by_field_name("type") else { return };
    let type_name = node_text(&type_node, source).to_string();

    if let Some(trait_node) = node.child_by_field_name("trait") {
        let trait_name = node_text(&trait_node, source).to_string();
        collector.relations.push(crate::domain::Relation {
            from_name: crate::domain::Entity::qualify(scope, &type_name),
            to_name: trait_name,
            relation_kind: RelationKind::Implements,
            context: format!("line {}", node.start_position().row + 1),
        });
    }

    if let Some(body) = node.child_by_field_name("body") {
        walk(&body, source, file_path, &type_name, builder, collector);
    }
}

fn extract_mod(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let Some(name) = field_name(node, source) else { return };
    let qualified = crate::domain::Entity::qualify(scope, &name);
    if let Some(body) = node.child_by_field_name("body") {
        walk(&body, source, file_path, &qualified, builder, collector);
    }
}

fn extract_use(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let text = node_text(node, source).trim().trim_end_matches(';').to_string();
    let start_line = node.start_position().row as u32 + 1;
    let qualified = format!("{}#use@{start_line}", if scope.is_empty() { file_path } else { scope });

    let entity = builder.entity(&qualified, EntityKind::Import, start_line, start_line, vec![text.clone()], "use_declaration");
    let chunk = builder.metadata_only_chunk(&entity, &qualified, text.clone(), start_line);
    collector.chunks.push(chunk);
    collector.entities.push(entity);
    collector
        .relations
        .push(crate::domain::Relation { from_name: file_path.to_string(), to_name: text, relation_kind: RelationKind::Imports, context: String::new() });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_top_level_function_with_doc_comment() {
        let source = "/// Adds two numbers\npub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let parser = RustParser::new();
        let result = parser.parse("src/lib.rs", source);
        let func = result.entities.iter().find(|e| e.name == "add").expect("function entity");
        assert_eq!(func.kind, EntityKind::Function);
        assert!(func.observations.iter().any(|o| o.contains("Adds two numbers")));
    }

    #[test]
    fn nests_methods_under_their_impl_type() {
        let source = "struct Counter;\n\nimpl Counter {\n    fn increment(&mut self) {}\n}\n";
        let parser = RustParser::new();
        let result = parser.parse("src/counter.rs", source);
        let method = result.entities.iter().find(|e| e.name == "Counter.increment").expect("method entity");
        assert_eq!(method.kind, EntityKind::Method);
    }

    #[test]
    fn every_relation_gets_its_own_chunk() {
        let source = "struct Foo;\ntrait Bar {}\nimpl Bar for Foo {}\n";
        let parser = RustParser::new();
        let result = parser.parse("src/foo.rs", source);
        let relation_chunks = result.chunks.iter().filter(|c| c.chunk_kind == crate::domain::ChunkKind::Relation).count();
        assert_eq!(relation_chunks, result.relations.len());
        assert!(relation_chunks > 0);
    }

    #[test]
    fn records_trait_implementation_relation() {
        let source = "struct Foo;\ntrait Bar {}\nimpl Bar for Foo {}\n";
        let parser = RustParser::new();
        let result = parser.parse("src/foo.rs", source);
        assert!(result
            .relations
            .iter()
            .any(|r| r.relation_kind == RelationKind::Implements && r.from_name == "Foo" && r.to_name == "Bar"));
    }

    #[test]
    fn malformed_source_yields_partial_result_not_panic() {
        let source = "fn broken( {{{ not valid rust";
        let parser = RustParser::new();
        let result = parser.parse("src/broken.rs", source);
        assert!(!result.syntax_errors.is_empty());
    }
}
