//! Extractor for JSON, YAML, and TOML configuration/manifest files.
//!
//! Top-level keys become `Variable` entities (Metadata-only — there is no
//! separate "implementation" for a config value), and a handful of
//! well-known manifest paths (`name`, `version`, `dependencies`, `scripts`)
//! are surfaced as observations on the file entity when present, per
//! `SPEC_FULL.md` §4.2.

use std::time::Instant;

use serde_json::Value as JsonValue;

use super::common::contains;
use crate::adapters::parsers::common::ChunkBuilder;
use crate::domain::{EntityKind, Language, ParserResult};
use crate::ports::parser::LanguageParser;

/// Which structured-data grammar to parse with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredFormat {
    /// `.json`
    Json,
    /// `.yaml`/`.yml`
    Yaml,
    /// `.toml`
    Toml,
}

/// Extracts top-level keys from a structured-data document.
pub struct StructuredDataParser {
    format: StructuredFormat,
}

impl StructuredDataParser {
    /// Build a parser for the given structured-data format.
    pub fn new(format: StructuredFormat) -> Self {
        Self { format }
    }
}

const WELL_KNOWN_PATHS: &[&str] = &["name", "version", "dependencies", "devDependencies", "scripts"];

impl LanguageParser for StructuredDataParser {
    fn parse(&self, file_path: &str, content: &str) -> ParserResult {
        let started = Instant::now();
        let mut syntax_errors = Vec::new();

        let value: Option<JsonValue> = match self.format {
            StructuredFormat::Json => match serde_json::from_str(content) {
                Ok(v) => Some(v),
                Err(e) => {
                    syntax_errors.push(format!("{file_path}: invalid JSON: {e}"));
                    None
                }
            },
            StructuredFormat::Yaml => match serde_yaml::from_str::<serde_yaml::Value>(content) {
                Ok(v) => serde_json::to_value(v).ok(),
                Err(e) => {
                    syntax_errors.push(format!("{file_path}: invalid YAML: {e}"));
                    None
                }
            },
            StructuredFormat::Toml => match content.parse::<toml::Value>() {
                Ok(v) => serde_json::to_value(v).ok(),
                Err(e) => {
                    syntax_errors.push(format!("{file_path}: invalid TOML: {e}"));
                    None
                }
            },
        };

        let builder = ChunkBuilder::new(file_path, content);
        let mut entities = Vec::new();
        let mut relations = Vec::new();
        let mut chunks = Vec::new();

        let mut file_observations = Vec::new();
        if let Some(JsonValue::Object(ref map)) = value {
            for key in WELL_KNOWN_PATHS {
                if let Some(v) = map.get(*key) {
                    file_observations.push(format!("{key}: {}", summarize(v)));
                }
            }
        }

        let file_entity = builder.entity(file_path, EntityKind::File, 1, content.lines().count().max(1) as u32, file_observations, "document");
        let file_chunk = builder.metadata_only_chunk(&file_entity, file_path, format!("file: {file_path}"), 1);
        chunks.push(file_chunk);
        entities.push(file_entity);

        if let Some(JsonValue::Object(map)) = value {
            for (key, val) in map.iter() {
                let qualified = format!("{file_path}.{key}");
                let start_line = 1;
                let observations = vec![format!("{key}: {}", summarize(val))];
                let entity = builder.entity(&qualified, EntityKind::Variable, start_line, start_line, observations.clone(), "key");
                let chunk = builder.metadata_only_chunk(&entity, &qualified, observations.join("\n"), start_line);
                chunks.push(chunk);
                entities.push(entity);
                relations.push(contains(file_path, &qualified));
            }
        }

        chunks.extend(super::common::relation_chunks(&builder, &relations));

        ParserResult { entities, relations, chunks, syntax_errors, parse_duration: started.elapsed() }
    }

    fn language(&self) -> Language {
        match self.format {
            StructuredFormat::Json => Language::Json,
            StructuredFormat::Yaml => Language::Yaml,
            StructuredFormat::Toml => Language::Toml,
        }
    }
}

fn summarize(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => format!("[{} items]", items.len()),
        JsonValue::Object(map) => format!("{{{} keys}}", map.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_package_json_well_known_fields() {
        let source = r#"{"name": "demo", "version": "1.0.0", "dependencies": {"tokio": "1.0"}}"#;
        let parser = StructuredDataParser::new(StructuredFormat::Json);
        let result = parser.parse("package.json", source);
        let file = result.entities.iter().find(|e| e.name == "package.json").expect("file entity");
        assert!(file.observations.iter().any(|o| o.starts_with("name: demo")));
        assert!(file.observations.iter().any(|o| o.starts_with("dependencies:")));
    }

    #[test]
    fn malformed_json_reports_syntax_error_without_panicking() {
        let parser = StructuredDataParser::new(StructuredFormat::Json);
        let result = parser.parse("broken.json", "{not valid json");
        assert!(!result.syntax_errors.is_empty());
    }

    #[test]
    fn yaml_top_level_keys_become_entities() {
        let source = "name: demo\nversion: \"1.0\"\n";
        let parser = StructuredDataParser::new(StructuredFormat::Yaml);
        let result = parser.parse("config.yaml", source);
        assert!(result.entities.iter().any(|e| e.name == "config.yaml.name"));
    }
}
