//! Shared helpers used by the tree-sitter-backed parsers.

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::domain::{
    AutomationMarkers, Chunk, ChunkId, ChunkKind, ChunkPayload, Entity, EntityKind, Origin, Relation, RelationKind,
};

/// SHA-256 hex digest of `content`, shared by C4's file hasher and every
/// parser's `source_hash` stamp so a file's hash is computed the same way
/// everywhere.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Everything needed to stamp a freshly parsed entity as auto-indexed and
/// build its Metadata/Implementation chunk pair.
pub struct ChunkBuilder {
    /// Normalized project-relative path of the file being parsed.
    pub file_path: String,
    /// SHA-256 of the whole file's content.
    pub source_hash: String,
    /// RFC 3339 timestamp stamped on every entity from this parse.
    pub parsed_at: String,
}

impl ChunkBuilder {
    /// Start a builder for one file, capturing "now" once so every entity
    /// in the file gets an identical `parsed_at`.
    pub fn new(file_path: &str, content: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            source_hash: content_hash(content),
            parsed_at: Utc::now().to_rfc3339(),
        }
    }

    fn markers(&self) -> AutomationMarkers {
        AutomationMarkers {
            file_path: Some(self.file_path.to_string()),
            ast_node_type: None,
            parsed_at: Some(self.parsed_at.clone()),
            source_hash: Some(self.source_hash.to_string()),
        }
    }

    /// Build an auto-indexed [`Entity`] for a parsed code object.
    pub fn entity(
        &self,
        name: &str,
        kind: EntityKind,
        start_line: u32,
        end_line: u32,
        observations: Vec<String>,
        ast_node_type: &str,
    ) -> Entity {
        let mut markers = self.markers();
        markers.ast_node_type = Some(ast_node_type.to_string());
        Entity {
            name: name.to_string(),
            kind,
            observations,
            origin: Some(Origin {
                file_path: self.file_path.to_string(),
                start_line,
                end_line,
            }),
            automation_markers: markers,
        }
    }

    /// Build the Metadata/Implementation chunk pair for one parsed entity.
    ///
    /// `has_implementation` is always `true` here: parsers only call this
    /// for entities whose body they also chunk. Entities with no body of
    /// their own (e.g. a bare import) should build a lone Metadata chunk
    /// via [`ChunkBuilder::metadata_only_chunk`] instead.
    pub fn chunk_pair(
        &self,
        entity: &Entity,
        qualified_name: &str,
        metadata_text: String,
        implementation_text: String,
        start_line: u32,
    ) -> [Chunk; 2] {
        let disambiguator = start_line.to_string();
        let metadata_id = ChunkId::new(&self.file_path, qualified_name, ChunkKind::Metadata, &disambiguator);
        let implementation_id = ChunkId::new(&self.file_path, qualified_name, ChunkKind::Implementation, &disambiguator);

        let base_payload = ChunkPayload {
            chunk_kind: ChunkKind::Metadata,
            entity_name: qualified_name.to_string(),
            entity_kind: entity.kind.as_str().to_string(),
            file_path: Some(self.file_path.to_string()),
            start_line: entity.origin.as_ref().map(|o| o.start_line),
            end_line: entity.origin.as_ref().map(|o| o.end_line),
            has_implementation: Some(true),
            source_hash: Some(self.source_hash.to_string()),
            parsed_at: Some(self.parsed_at.clone()),
            observations: entity.observations.clone(),
            relation_kind: None,
            from: None,
            to: None,
            aliases: None,
        };

        let metadata_chunk = Chunk {
            id: metadata_id,
            entity_name: qualified_name.to_string(),
            chunk_kind: ChunkKind::Metadata,
            content: metadata_text,
            payload: base_payload.clone(),
        };

        let implementation_chunk = Chunk {
            id: implementation_id,
            entity_name: qualified_name.to_string(),
            chunk_kind: ChunkKind::Implementation,
            content: implementation_text,
            payload: ChunkPayload {
                chunk_kind: ChunkKind::Implementation,
                has_implementation: None,
                ..base_payload
            },
        };

        [metadata_chunk, implementation_chunk]
    }

    /// Build a lone Metadata chunk for an entity with no separate body
    /// (imports, documentation sections, structured-data keys).
    pub fn metadata_only_chunk(&self, entity: &Entity, qualified_name: &str, text: String, start_line: u32) -> Chunk {
        let disambiguator = start_line.to_string();
        let id = ChunkId::new(&self.file_path, qualified_name, ChunkKind::Metadata, &disambiguator);
        Chunk {
            id,
            entity_name: qualified_name.to_string(),
            chunk_kind: ChunkKind::Metadata,
            content: text,
            payload: ChunkPayload {
                chunk_kind: ChunkKind::Metadata,
                entity_name: qualified_name.to_string(),
                entity_kind: entity.kind.as_str().to_string(),
                file_path: Some(self.file_path.to_string()),
                start_line: entity.origin.as_ref().map(|o| o.start_line),
                end_line: entity.origin.as_ref().map(|o| o.end_line),
                has_implementation: Some(false),
                source_hash: Some(self.source_hash.to_string()),
                parsed_at: Some(self.parsed_at.clone()),
                observations: entity.observations.clone(),
                relation_kind: None,
                from: None,
                to: None,
                aliases: None,
            },
        }
    }

    /// Build a Relation chunk for one edge.
    pub fn relation_chunk(&self, relation: &Relation, disambiguator: &str) -> Chunk {
        let qualified = format!("{}->{}", relation.from_name, relation.to_name);
        let id = ChunkId::new(&self.file_path, &qualified, ChunkKind::Relation, disambiguator);
        Chunk {
            id,
            entity_name: qualified.clone(),
            chunk_kind: ChunkKind::Relation,
            content: format!(
                "{} {} {} ({})",
                relation.from_name,
                relation.relation_kind.as_str(),
                relation.to_name,
                relation.context
            ),
            payload: ChunkPayload {
                chunk_kind: ChunkKind::Relation,
                entity_name: qualified,
                entity_kind: String::new(),
                file_path: Some(self.file_path.to_string()),
                start_line: None,
                end_line: None,
                has_implementation: None,
                source_hash: None,
                parsed_at: Some(self.parsed_at.clone()),
                observations: vec![],
                relation_kind: Some(relation.relation_kind.as_str().to_string()),
                from: Some(relation.from_name.clone()),
                to: Some(relation.to_name.clone()),
                aliases: None,
            },
        }
    }
}

/// Build one Relation chunk per entry in `relations`, disambiguated by
/// position so that two edges sharing the same endpoints (e.g. two
/// `Contains` edges from the same file, or a function calling the same
/// callee twice) never collide on id.
///
/// Every parser must call this once, after its own entity/relation walk,
/// and append the result to its chunk list: `ParserResult.relations`
/// alone does not satisfy invariant 3 (`SPEC_FULL.md` §3) — a Relation
/// only exists in the vector store once it has a Relation chunk.
pub fn relation_chunks(builder: &ChunkBuilder, relations: &[Relation]) -> Vec<Chunk> {
    relations
        .iter()
        .enumerate()
        .map(|(index, relation)| builder.relation_chunk(relation, &index.to_string()))
        .collect()
}

/// Build a `Contains` relation from a parent to a child qualified name.
pub fn contains(parent: &str, child: &str) -> Relation {
    Relation {
        from_name: parent.to_string(),
        to_name: child.to_string(),
        relation_kind: RelationKind::Contains,
        context: String::new(),
    }
}

/// 1-based line number of a byte offset within `content`.
pub fn line_number(content: &str, byte_offset: usize) -> u32 {
    content[..byte_offset.min(content.len())].matches('\n').count() as u32 + 1
}
