//! Tree-sitter-backed extractor for Python source files.

use std::time::Instant;

use tree_sitter::{Node, Parser};

use super::common::{contains, ChunkBuilder};
use crate::domain::{Entity, EntityCollector, EntityKind, Language, ParserResult, Relation, RelationKind};
use crate::ports::parser::LanguageParser;

/// Extracts functions, classes, and methods from Python source using the
/// `tree-sitter-python` grammar.
#[derive(Default)]
pub struct PythonParser;

impl PythonParser {
    /// Construct a new parser instance. Stateless; safe to share.
    pub fn new() -> Self {
        Self
    }
}

impl LanguageParser for PythonParser {
    fn parse(&self, file_path: &str, content: &str) -> ParserResult {
        let started = Instant::now();
        let mut parser = Parser::new();
        let mut syntax_errors = Vec::new();

        if parser.set_language(&tree_sitter_python::LANGUAGE.into()).is_err() {
            syntax_errors.push("failed to load tree-sitter-python grammar".to_string());
            return ParserResult::empty(started.elapsed());
        }

        let Some(tree) = parser.parse(content, None) else {
            syntax_errors.push("tree-sitter-python failed to produce a parse tree".to_string());
            return ParserResult::empty(started.elapsed());
        };

        if tree.root_node().has_error() {
            syntax_errors.push(format!("{file_path}: source contains syntax errors; partial results returned"));
        }

        let builder = ChunkBuilder::new(file_path, content);
        let mut collector = EntityCollector::new();

        let file_entity = builder.entity(file_path, EntityKind::File, 1, content.lines().count().max(1) as u32, vec![], "module");
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
        Language::Python
    }
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

fn walk(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_definition" => extract_function(&child, source, file_path, scope, builder, collector),
            "class_definition" => extract_class(&child, source, file_path, scope, builder, collector),
            "import_statement" | "import_from_statement" => extract_import(&child, source, file_path, scope, builder, collector),
            "decorated_definition" => walk(&child, source, file_path, scope, builder, collector),
            "block" | "module" => walk(&child, source, file_path, scope, builder, collector),
            _ => {}
        }
    }
}

fn docstring(body: &Node, source: &str) -> Option<String> {
    let mut cursor = body.walk();
    let first = body.children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = first.child(0)?;
    if string_node.kind() != "string" {
        return None;
    }
    Some(node_text(&string_node, source).trim_matches(['"', '\''].as_ref()).trim().to_string())
}

fn extract_function(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let Some(name_node) = node.child_by_field_name("name") else { return };
    let name = node_text(&name_node, source).to_string();
    let qualified = Entity::qualify(scope, &name);
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;

    let signature_end = node.child_by_field_name("body").map(|b| b.start_byte()).unwrap_or(node.end_byte());
    let mut observations = vec![source[node.start_byte()..signature_end].trim().trim_end_matches(':').to_string()];
    if let Some(body) = node.child_by_field_name("body") {
        if let Some(doc) = docstring(&body, source) {
            observations.push(doc);
        }
    }

    let kind = if scope.is_empty() { EntityKind::Function } else { EntityKind::Method };
    let entity = builder.entity(&qualified, kind, start_line, end_line, observations, "function_definition");
    let [meta, implementation] = builder.chunk_pair(&entity, &qualified, entity.observations.join("\n"), node_text(node, source).to_string(), start_line);
    collector.relations.push(contains(if scope.is_empty() { file_path } else { scope }, &qualified));
    collector.chunks.push(meta);
    collector.chunks.push(implementation);
    collector.entities.push(entity);
    collector.note_name(&qualified, start_line);

    extract_calls(node, source, &qualified, collector);

    // A function or class nested inside this one's body is scoped under
    // this entity's qualified name, so e.g. `ClassA.method_b.inner_c`
    // nests as deep as the source does (mirrors extract_class below).
    if let Some(body) = node.child_by_field_name("body") {
        walk(&body, source, file_path, &qualified, builder, collector);
    }
}

/// Walk a function body for `call` expressions, emitting a `Calls`
/// relation per call site keyed by the callee's bare text (resolved to an
/// entity by name later, at query time — the parser itself does not
/// attempt call-target resolution).
fn extract_calls(node: &Node, source: &str, caller: &str, collector: &mut EntityCollector) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "call" {
            if let Some(func) = child.child_by_field_name("function") {
                let callee = node_text(&func, source).to_string();
                collector.relations.push(Relation {
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

fn extract_class(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let Some(name_node) = node.child_by_field_name("name") else { return };
    let name = node_text(&name_node, source).to_string();
    let qualified = Entity::qualify(scope, &name);
    let start_line = node.start_position().row as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;

    let mut observations = vec![format!("class {name}")];
    if let Some(body) = node.child_by_field_name("body") {
        if let Some(doc) = docstring(&body, source) {
            observations.push(doc);
        }
    }
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for base in superclasses.children(&mut cursor) {
            if base.kind() == "identifier" {
                collector.relations.push(Relation {
                    from_name: qualified.clone(),
                    to_name: node_text(&base, source).to_string(),
                    relation_kind: RelationKind::Inherits,
                    context: format!("line {start_line}"),
                });
            }
        }
    }

    let entity = builder.entity(&qualified, EntityKind::Class, start_line, end_line, observations, "class_definition");
    let [meta, implementation] = builder.chunk_pair(&entity, &qualified, entity.observations.join("\n"), node_text(node, source).to_string(), start_line);
    collector.relations.push(contains(if scope.is_empty() { file_path } else { scope }, &qualified));
    collector.chunks.push(meta);
    collector.chunks.push(implementation);
    collector.entities.push(entity);
    collector.note_name(&qualified, start_line);

    if let Some(body) = node.child_by_field_name("body") {
        walk(&body, source, file_path, &qualified, builder, collector);
    }
}

fn extract_import(node: &Node, source: &str, file_path: &str, scope: &str, builder: &ChunkBuilder, collector: &mut EntityCollector) {
    let text = node_text(node, source).trim().to_string();
    let start_line = node.start_position().row as u32 + 1;
    let qualified = format!("{}#import@{start_line}", if scope.is_empty() { file_path } else { scope });

    let entity = builder.entity(&qualified, EntityKind::Import, start_line, start_line, vec![text.clone()], node.kind());
    let chunk = builder.metadata_only_chunk(&entity, &qualified, text.clone(), start_line);
    collector.chunks.push(chunk);
    collector.entities.push(entity);
    collector.relations.push(Relation { from_name: file_path.to_string(), to_name: text, relation_kind: RelationKind::Imports, context: String::new() });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_with_docstring() {
        let source = "def greet(name):\n    \"\"\"Say hello.\"\"\"\n    return f\"hi {name}\"\n";
        let parser = PythonParser::new();
        let result = parser.parse("app.py", source);
        let func = result.entities.iter().find(|e| e.name == "greet").expect("function entity");
        assert!(func.observations.iter().any(|o| o.contains("Say hello")));
    }

    #[test]
    fn records_call_relation_from_function_body() {
        let source = "def helper():\n    pass\n\ndef main():\n    helper()\n";
        let parser = PythonParser::new();
        let result = parser.parse("app.py", source);
        assert!(result.relations.iter().any(|r| r.relation_kind == RelationKind::Calls && r.from_name == "main" && r.to_name == "helper"));
    }

    #[test]
    fn nests_methods_under_class_and_records_inheritance() {
        let source = "class Animal:\n    pass\n\nclass Dog(Animal):\n    def bark(self):\n        pass\n";
        let parser = PythonParser::new();
        let result = parser.parse("animals.py", source);
        assert!(result.entities.iter().any(|e| e.name == "Dog.bark"));
        assert!(result.relations.iter().any(|r| r.relation_kind == RelationKind::Inherits && r.from_name == "Dog" && r.to_name == "Animal"));
    }
}
