//! Core entity, relation, and chunk types (C1)
//!
//! These types are the vocabulary every language parser (C2) emits into
//! and every downstream stage (dedup, embedding, vector store) consumes.
//! See `SPEC_FULL.md` §3 and §4.1 for the identity rules this module
//! implements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of code entity extracted from a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A whole source file.
    File,
    /// A class, struct, interface, or similar type definition.
    Class,
    /// A free-standing function.
    Function,
    /// A function bound to a type (method, associated function).
    Method,
    /// A module-level or class-level variable/constant binding.
    Variable,
    /// An import/require/use statement.
    Import,
    /// A section of human-written documentation (markdown header, text window).
    DocumentationSection,
}

impl EntityKind {
    /// Stable lowercase name used in chunk payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Import => "import",
            Self::DocumentationSection => "documentation_section",
        }
    }
}

/// Where an entity came from in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Project-relative, normalized (forward-slash, no leading `./`) path.
    pub file_path: String,
    /// 1-based inclusive start line.
    pub start_line: u32,
    /// 1-based inclusive end line.
    pub end_line: u32,
}

/// Metadata a parser stamps onto an entity to mark it auto-indexed.
///
/// The *presence* of any field here — not the entity's `kind` — is what
/// classifies an entity as auto-indexed versus manual. See
/// [`is_auto_indexed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationMarkers {
    /// Project-relative file path this entity was parsed from.
    pub file_path: Option<String>,
    /// Tree-sitter (or equivalent) node kind the entity was extracted from.
    pub ast_node_type: Option<String>,
    /// When the parser produced this entity (RFC 3339).
    pub parsed_at: Option<String>,
    /// SHA-256 of the owning file's content at parse time.
    pub source_hash: Option<String>,
}

impl AutomationMarkers {
    /// Whether any marker field is set. A pure function of the struct's
    /// contents — no entity-kind list is ever consulted (SPEC_FULL §4.1).
    pub fn is_present(&self) -> bool {
        self.file_path.is_some()
            || self.ast_node_type.is_some()
            || self.parsed_at.is_some()
            || self.source_hash.is_some()
    }
}

/// One extracted code object: a file, class, function, import, etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Name unique within its collection and scope; see [`Entity::qualified_name`].
    pub name: String,
    /// What kind of object this is.
    pub kind: EntityKind,
    /// Ordered list of short human-readable observations (signature, docstring, …).
    pub observations: Vec<String>,
    /// Source location, if the entity was derived from a file.
    pub origin: Option<Origin>,
    /// Automation metadata. Empty/default ⇒ manual entity.
    pub automation_markers: AutomationMarkers,
}

impl Entity {
    /// Whether this entity was produced by a parser rather than entered by hand.
    pub fn is_auto_indexed(&self) -> bool {
        self.automation_markers.is_present()
    }

    /// Dotted qualified name for a nested scope, e.g. `ClassA.method_b`.
    pub fn qualify(parent: &str, child: &str) -> String {
        if parent.is_empty() {
            child.to_string()
        } else {
            format!("{parent}.{child}")
        }
    }
}

/// Kind of directed edge between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Parent entity structurally contains the child (file contains function, …).
    Contains,
    /// Source file imports the target module/file.
    Imports,
    /// Caller invokes callee.
    Calls,
    /// Subclass inherits from base class.
    Inherits,
    /// Type implements an interface/trait.
    Implements,
    /// Generic reference not covered by the other kinds (e.g. JSX element use).
    Uses,
    /// A documentation section links to another entity or file.
    DocumentsLink,
}

impl RelationKind {
    /// Stable lowercase name used in chunk payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Imports => "imports",
            Self::Calls => "calls",
            Self::Inherits => "inherits",
            Self::Implements => "implements",
            Self::Uses => "uses",
            Self::DocumentsLink => "documents_link",
        }
    }
}

/// A directed, typed edge between two entities, identified by qualified name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Qualified name of the source entity.
    pub from_name: String,
    /// Qualified name of the target entity.
    pub to_name: String,
    /// Edge type.
    pub relation_kind: RelationKind,
    /// Free-form context string (e.g. the call-site line, import alias).
    pub context: String,
}

/// Which half of progressive disclosure a chunk represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Signature + docstring + header-level summary.
    Metadata,
    /// Full body text.
    Implementation,
    /// Serialized relation edge.
    Relation,
}

impl ChunkKind {
    /// Stable lowercase name used in chunk payloads and filter predicates.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Implementation => "implementation",
            Self::Relation => "relation",
        }
    }
}

/// A stable, collision-free chunk identifier.
///
/// Computed as a SHA-256 hash over `(normalized_file_path,
/// entity_qualified_name, chunk_kind, disambiguator)` — see
/// `SPEC_FULL.md` §4.1. Using the entity's start line as the
/// disambiguator (rather than content) means the id survives a body edit,
/// which is exactly the property incremental re-indexing needs: the
/// indexer must find a changed file's *prior* chunk ids to delete them,
/// without those ids having changed underneath it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    /// Compute a chunk id from its identity tuple.
    ///
    /// `disambiguator` should be the entity's start line (as a string) for
    /// Metadata/Implementation chunks, or a stable string built from both
    /// endpoint names for Relation chunks.
    pub fn new(file_path: &str, qualified_name: &str, chunk_kind: ChunkKind, disambiguator: &str) -> Self {
        let normalized = normalize_path(file_path);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update(b"\0");
        hasher.update(qualified_name.as_bytes());
        hasher.update(b"\0");
        hasher.update(chunk_kind.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(disambiguator.as_bytes());
        let digest = hasher.finalize();
        Self(hex_encode(&digest))
    }

    /// Borrow the id as a plain string (vector-store point id).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a path to forward slashes with no leading `./`, for use as
/// the path component of chunk identity and as the payload `file_path`.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced
        .strip_prefix("./")
        .unwrap_or(&replaced)
        .trim_end_matches('/')
        .to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Payload carried by every point in the vector store; see `SPEC_FULL.md`
/// §6 for the wire schema this mirrors field-for-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Which disclosure tier this chunk is.
    pub chunk_kind: ChunkKind,
    /// Owning entity's qualified name.
    pub entity_name: String,
    /// Owning entity's kind, as a string (absent for Relation chunks -> empty).
    pub entity_kind: String,
    /// Source file path, present for auto-indexed entries.
    pub file_path: Option<String>,
    /// Start line, present for auto-indexed entries.
    pub start_line: Option<u32>,
    /// End line, present for auto-indexed entries.
    pub end_line: Option<u32>,
    /// True iff a sibling Implementation chunk exists (Metadata chunks only).
    pub has_implementation: Option<bool>,
    /// Content hash of the owning file, present for auto-indexed entries.
    pub source_hash: Option<String>,
    /// RFC 3339 timestamp the entity was parsed, present for auto-indexed entries.
    pub parsed_at: Option<String>,
    /// Copy of the entity's observations, for filterable display.
    pub observations: Vec<String>,
    /// Edge kind, present for Relation chunks.
    pub relation_kind: Option<String>,
    /// Edge source qualified name, present for Relation chunks.
    pub from: Option<String>,
    /// Edge target qualified name, present for Relation chunks.
    pub to: Option<String>,
    /// When this chunk is an alias of another chunk's already-embedded
    /// vector (C9 deduplication), the id of the chunk whose vector is
    /// shared. Absent for chunks that own their own vector.
    pub aliases: Option<String>,
}

impl ChunkPayload {
    /// Whether this payload marks a manual (non-auto-indexed) entry: the
    /// pure function described in `SPEC_FULL.md` §4.1 — absence of every
    /// automation-marker field, regardless of `entity_kind`.
    pub fn is_manual(&self) -> bool {
        self.file_path.is_none()
            && self.start_line.is_none()
            && self.end_line.is_none()
            && self.source_hash.is_none()
            && self.parsed_at.is_none()
    }
}

/// A unit of vector storage: a Metadata view, an Implementation body, or a
/// serialized Relation edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable, collision-free identifier.
    pub id: ChunkId,
    /// Back-reference to the owning entity's qualified name.
    pub entity_name: String,
    /// Which disclosure tier this is.
    pub chunk_kind: ChunkKind,
    /// Text that will be embedded.
    pub content: String,
    /// Everything needed for filtering and reconstruction.
    pub payload: ChunkPayload,
}

/// Everything one parser invocation produces for one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserResult {
    /// Entities discovered in the file.
    pub entities: Vec<Entity>,
    /// Relations discovered in the file.
    pub relations: Vec<Relation>,
    /// Chunks ready for deduplication/embedding.
    pub chunks: Vec<Chunk>,
    /// Non-fatal parse errors; a parser populates this instead of failing
    /// the whole file when only part of it is recoverable.
    pub syntax_errors: Vec<String>,
    /// Wall-clock time the parse took.
    pub parse_duration: std::time::Duration,
}

impl ParserResult {
    /// An empty result with the given parse duration, used by parsers
    /// that find nothing indexable (e.g. an empty file).
    pub fn empty(parse_duration: std::time::Duration) -> Self {
        Self {
            parse_duration,
            ..Default::default()
        }
    }
}

/// Build-helper used by parsers to keep a file's own entities/relations
/// ordered and to disambiguate same-name siblings by start line.
#[derive(Debug, Default)]
pub struct EntityCollector {
    /// File path these entities belong to (normalized).
    pub entities: Vec<Entity>,
    /// Relations gathered alongside the entities.
    pub relations: Vec<Relation>,
    /// Chunks built so far.
    pub chunks: Vec<Chunk>,
    names_seen: BTreeMap<String, u32>,
}

impl EntityCollector {
    /// Create a new, empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` was used at `start_line`, for diagnostics when
    /// two same-named siblings appear in one file (identity still
    /// disambiguates by line; this just helps a parser log it).
    pub fn note_name(&mut self, name: &str, start_line: u32) {
        self.names_seen.insert(format!("{name}@{start_line}"), start_line);
    }

    /// Consume the collector into its finished pieces.
    pub fn finish(self, parse_duration: std::time::Duration, syntax_errors: Vec<String>) -> ParserResult {
        ParserResult {
            entities: self.entities,
            relations: self.relations,
            chunks: self.chunks,
            syntax_errors,
            parse_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_stable_across_identical_inputs() {
        let a = ChunkId::new("src/a.py", "foo", ChunkKind::Metadata, "1");
        let b = ChunkId::new("src/a.py", "foo", ChunkKind::Metadata, "1");
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_id_unaffected_by_content_changes() {
        // Identity depends on path+name+kind+line, not on body text, so an
        // edited function body keeps the same Implementation chunk id.
        let before = ChunkId::new("src/a.py", "foo", ChunkKind::Implementation, "1");
        let after = ChunkId::new("src/a.py", "foo", ChunkKind::Implementation, "1");
        assert_eq!(before, after);
    }

    #[test]
    fn chunk_id_disambiguates_same_name_different_line() {
        let first = ChunkId::new("src/a.py", "__init__", ChunkKind::Metadata, "4");
        let second = ChunkId::new("src/a.py", "__init__", ChunkKind::Metadata, "40");
        assert_ne!(first, second);
    }

    #[test]
    fn chunk_id_disambiguates_by_kind() {
        let meta = ChunkId::new("src/a.py", "foo", ChunkKind::Metadata, "1");
        let body = ChunkId::new("src/a.py", "foo", ChunkKind::Implementation, "1");
        assert_ne!(meta, body);
    }

    #[test]
    fn chunk_id_disambiguates_by_path() {
        let a = ChunkId::new("src/a.py", "foo", ChunkKind::Metadata, "1");
        let b = ChunkId::new("src/b.py", "foo", ChunkKind::Metadata, "1");
        assert_ne!(a, b);
    }

    #[test]
    fn normalize_path_strips_dot_slash_and_trailing_slash() {
        assert_eq!(normalize_path("./src/a.py"), "src/a.py");
        assert_eq!(normalize_path("src/a.py/"), "src/a.py");
        assert_eq!(normalize_path("src\\a.py"), "src/a.py");
    }

    #[test]
    fn manual_payload_has_no_automation_fields() {
        let payload = ChunkPayload {
            chunk_kind: ChunkKind::Metadata,
            entity_name: "manual-note".into(),
            entity_kind: "variable".into(),
            file_path: None,
            start_line: None,
            end_line: None,
            has_implementation: None,
            source_hash: None,
            parsed_at: None,
            observations: vec![],
            relation_kind: None,
            from: None,
            to: None,
            aliases: None,
        };
        assert!(payload.is_manual());
    }
}
