//! Indexer Core (C7): orchestrates discovery, diff, parse, embed, upsert,
//! and owns orphan relation garbage collection.
//!
//! The ten steps below follow `SPEC_FULL.md` §4.7 exactly. Concurrency
//! follows §5: a bounded worker pool runs parse+embed per file, the
//! vector store is the single serialization point, and a `ParserResult`
//! is moved from stage to stage rather than shared.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::adapters::parsers::registry::ParserRegistry;
use crate::application::dedup::plan_deduplication;
use crate::application::discovery::discover;
use crate::application::gc::collect_orphans;
use crate::application::report::{ClearingPolicy, FileError, FileOutcome, FileStatus, IndexMode, IndexReport};
use crate::domain::{Chunk, ChunkKind, Result};
use crate::infrastructure::config::ProjectConfig;
use crate::infrastructure::state::{hash_content, CollectionLock, FileState, StateStore, STATE_FORMAT_VERSION};
use crate::ports::embedding::EmbeddingProvider;
use crate::ports::vector_store::{PayloadFilter, VectorPoint, VectorStoreProvider};

/// Tunables for one `index()` call, on top of the mode and clearing
/// policy that select *which* files get reparsed.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// How many files may be parsed concurrently.
    pub max_concurrent_files: usize,
    /// How the collection's existing points are treated before a
    /// `FullRebuild` reparses everything.
    pub clearing_policy: ClearingPolicy,
    /// Cooperative cancellation, checked at each file's I/O boundary
    /// (`SPEC_FULL.md` §5/§9). A fresh token never fires; callers that
    /// want SIGINT-driven cancellation share one token between this call
    /// and a signal handler.
    pub cancellation: CancellationToken,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { max_concurrent_files: 8, clearing_policy: ClearingPolicy::PreserveManual, cancellation: CancellationToken::new() }
    }
}

/// Orchestrates one indexing run against one collection. Holds no
/// per-run state of its own; every call to [`Indexer::index`] is
/// independent except for what's recorded in the state store and vector
/// store it's handed.
pub struct Indexer {
    registry: Arc<ParserRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl Indexer {
    /// Build an indexer from its three collaborators (C2/C3, C5, C6).
    pub fn new(registry: Arc<ParserRegistry>, embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStoreProvider>) -> Self {
        Self { registry, embedder, store }
    }

    /// Run one indexing pass against `project_root`.
    ///
    /// Holds an exclusive advisory lock on the collection's state
    /// directory for the duration of the run (`SPEC_FULL.md` §4.4/§5), so
    /// two indexer processes never interleave writes to the same
    /// collection on one machine. Lock contention is a per-collection
    /// error: the run aborts and state is left unchanged.
    #[instrument(skip(self, project_config, options), fields(collection, mode = ?mode))]
    pub async fn index(
        &self,
        project_root: &Path,
        collection: &str,
        mode: IndexMode,
        project_config: &ProjectConfig,
        options: IndexOptions,
    ) -> Result<IndexReport> {
        let started = Instant::now();
        let mut report = IndexReport::new(collection);

        let state_dir = project_root.join(".semantic-index");
        let _lock = CollectionLock::acquire(&state_dir, collection)?;

        // Step 1: load persisted state for this collection.
        let state_store = StateStore::for_collection(project_root, collection);
        let mut state = state_store.load()?;

        // Step 2: discover files, per mode.
        let discovered = match &mode {
            IndexMode::SingleFile(path) => {
                let absolute = project_root.join(path);
                vec![crate::application::discovery::DiscoveredFile {
                    relative_path: crate::domain::entity::normalize_path(path),
                    absolute_path: absolute,
                }]
            }
            IndexMode::FullRebuild | IndexMode::Incremental => {
                let result = discover(project_root, project_config)?;
                for path in result.oversized {
                    report.errors.push(FileError { path: path.clone(), message: "file exceeds max_file_size".to_string() });
                    report.files.push(FileOutcome { path, status: FileStatus::Failed });
                }
                result.files
            }
        };

        // Step 3: ensure the collection exists before anything is upserted.
        self.store.ensure_collection(collection, self.embedder.dimension()).await?;

        // Step 4: apply the clearing policy ahead of a full rebuild.
        if mode == IndexMode::FullRebuild {
            self.apply_clearing_policy(collection, options.clearing_policy).await?;
            state.files.clear();
        }

        // Step 5: diff discovered files against state to classify each one.
        let mut to_parse = Vec::new();
        let mut unchanged_paths: Vec<String> = Vec::new();
        let mut discovered_paths: HashSet<String> = HashSet::new();
        for file in &discovered {
            discovered_paths.insert(file.relative_path.clone());
            let content = match std::fs::read(&file.absolute_path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    // A SingleFile run's target can be gone by the time it's
                    // processed (the watcher fires this mode for remove
                    // events too); if it was previously indexed, that's a
                    // deletion, not a failure, and its chunks must go with it.
                    if matches!(mode, IndexMode::SingleFile(_)) {
                        if let Some(entry) = state.files.remove(&file.relative_path) {
                            self.store.delete_by_ids(collection, &entry.chunk_ids).await?;
                            report.chunks_deleted += entry.chunk_ids.len();
                            report.files.push(FileOutcome { path: file.relative_path.clone(), status: FileStatus::Deleted });
                            continue;
                        }
                    }
                    report.errors.push(FileError { path: file.relative_path.clone(), message: err.to_string() });
                    report.files.push(FileOutcome { path: file.relative_path.clone(), status: FileStatus::Failed });
                    continue;
                }
            };
            let hash = hash_content(&content);
            let status = match state.files.get(&file.relative_path) {
                Some(existing) if existing.sha256 == hash && mode != IndexMode::FullRebuild => FileStatus::Unchanged,
                Some(_) => FileStatus::Modified,
                None => FileStatus::Added,
            };
            if status == FileStatus::Unchanged {
                unchanged_paths.push(file.relative_path.clone());
                report.files.push(FileOutcome { path: file.relative_path.clone(), status });
                continue;
            }
            to_parse.push((file.clone(), content, hash, status));
        }

        // Step 6: files present in state but no longer discovered are deletions.
        if !matches!(mode, IndexMode::SingleFile(_)) {
            let deleted: Vec<String> = state.files.keys().filter(|path| !discovered_paths.contains(*path)).cloned().collect();
            for path in deleted {
                if let Some(entry) = state.files.remove(&path) {
                    self.store.delete_by_ids(collection, &entry.chunk_ids).await?;
                    report.chunks_deleted += entry.chunk_ids.len();
                }
                report.files.push(FileOutcome { path, status: FileStatus::Deleted });
            }
        }

        // Step 7: delete the prior chunks of every modified file before
        // reparsing it, so a shrunk file never leaves stale chunks behind.
        for (file, _, _, status) in &to_parse {
            if *status == FileStatus::Modified {
                if let Some(entry) = state.files.get(&file.relative_path) {
                    self.store.delete_by_ids(collection, &entry.chunk_ids).await?;
                    report.chunks_deleted += entry.chunk_ids.len();
                }
            }
        }

        info!(added_or_modified = to_parse.len(), unchanged = unchanged_paths.len(), "discovery complete");

        // Step 8: parse every added/modified file, bounded by a semaphore
        // so CPU-bound tree-sitter work doesn't starve the runtime. A
        // cancellation request stops new files from being *spawned*;
        // files already in flight are allowed to finish, per §5.
        let semaphore = Arc::new(Semaphore::new(options.max_concurrent_files.max(1)));
        let mut joins = JoinSet::new();
        for (file, content, hash, status) in to_parse {
            if options.cancellation.is_cancelled() {
                break;
            }
            let registry = Arc::clone(&self.registry);
            let semaphore = Arc::clone(&semaphore);
            joins.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let content_string = String::from_utf8_lossy(&content).into_owned();
                let relative_path = file.relative_path.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let parser = registry.resolve(&relative_path);
                    parser.parse(&relative_path, &content_string)
                })
                .await;
                (file, hash, status, result)
            });
        }

        let mut parsed_files = Vec::new();
        while let Some(joined) = joins.join_next().await {
            let Ok((file, hash, status, parse_result)) = joined else { continue };
            match parse_result {
                Ok(parser_result) => {
                    for err in &parser_result.syntax_errors {
                        report.errors.push(FileError { path: file.relative_path.clone(), message: err.clone() });
                    }
                    parsed_files.push((file, hash, status, parser_result));
                }
                Err(join_error) => {
                    report.errors.push(FileError { path: file.relative_path.clone(), message: join_error.to_string() });
                    report.files.push(FileOutcome { path: file.relative_path.clone(), status: FileStatus::Failed });
                }
            }
        }

        // Step 9: deduplicate, embed, and upsert per file (the vector
        // store is the single serialization point; files interleave
        // freely but each file's upsert is atomic with its own chunks).
        // Liveness for orphan GC spans the whole collection (SPEC_FULL.md
        // §4.7.3 step 2: "scroll with filter chunk_kind == Metadata,
        // collecting the set of live entity_names"), never just the files
        // touched this run — a SingleFile run only discovers its one path,
        // so seeding the live set from that alone would make every other
        // file's relations look orphaned. By this point stale chunks of
        // deleted/modified files are already gone (steps 6-7), so this
        // scroll already reflects this run's true survivors; unchanged and
        // untouched files contribute their existing Metadata chunks for
        // free.
        let metadata_filter = PayloadFilter { file_path: None, chunk_kind: Some(ChunkKind::Metadata) };
        let existing_metadata = self.store.scroll(collection, &metadata_filter).await?;
        let mut live_entity_names: HashSet<String> = existing_metadata.into_iter().map(|point| point.payload.entity_name).collect();

        for (file, hash, _status, parser_result) in parsed_files {
            if options.cancellation.is_cancelled() {
                break;
            }
            for entity in &parser_result.entities {
                live_entity_names.insert(entity.name.clone());
            }

            match self.embed_and_upsert(collection, &parser_result.chunks, &mut report).await {
                Ok(chunk_ids) => {
                    state.files.insert(
                        file.relative_path.clone(),
                        FileState { sha256: hash, last_indexed_at: chrono::Utc::now().to_rfc3339(), chunk_ids },
                    );
                    report.files.push(FileOutcome { path: file.relative_path.clone(), status: FileStatus::Added });
                }
                Err(err) => {
                    report.errors.push(FileError { path: file.relative_path.clone(), message: err.to_string() });
                    report.files.push(FileOutcome { path: file.relative_path.clone(), status: FileStatus::Failed });
                }
            }
        }

        if options.cancellation.is_cancelled() {
            warn!("index run cancelled; leaving on-disk state unchanged");
            report.aborted = true;
            report.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        // Step 10: orphan relation GC, then persist state on clean completion.
        report.relations_garbage_collected = collect_orphans(self.store.as_ref(), collection, &live_entity_names).await?;
        state.version = STATE_FORMAT_VERSION;
        state_store.save(&state)?;

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            chunks_upserted = report.chunks_upserted,
            chunks_deleted = report.chunks_deleted,
            relations_gc = report.relations_garbage_collected,
            duration_ms = report.duration_ms,
            "index run complete"
        );
        Ok(report)
    }

    async fn apply_clearing_policy(&self, collection: &str, policy: ClearingPolicy) -> Result<()> {
        match policy {
            ClearingPolicy::None => Ok(()),
            ClearingPolicy::ClearAll => {
                self.store.delete_by_filter(collection, &PayloadFilter::all()).await?;
                Ok(())
            }
            ClearingPolicy::PreserveManual => {
                let all = self.store.scroll(collection, &PayloadFilter::all()).await?;
                let auto_indexed: Vec<_> = all.into_iter().filter(|p| !p.payload.is_manual()).map(|p| p.id).collect();
                self.store.delete_by_ids(collection, &auto_indexed).await?;
                Ok(())
            }
        }
    }

    async fn embed_and_upsert(&self, collection: &str, chunks: &[Chunk], report: &mut IndexReport) -> Result<Vec<crate::domain::ChunkId>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let plan = plan_deduplication(chunks);
        report.chunks_deduplicated += crate::application::dedup::count_deduplicated(&plan);

        let texts: Vec<String> = plan.unique_indices.iter().map(|&i| chunks[i].content.clone()).collect();
        let embeddings = if texts.is_empty() { Vec::new() } else { self.embedder.embed_batch(&texts).await? };

        let mut vector_by_index = std::collections::HashMap::new();
        for (position, &chunk_index) in plan.unique_indices.iter().enumerate() {
            if let Some(embedding) = embeddings.get(position) {
                report.tokens_embedded += embedding.tokens_in as u64;
                report.cost_usd += embedding.cost_usd.unwrap_or(0.0);
                vector_by_index.insert(chunk_index, embedding.vector.clone());
            }
        }

        let mut points = Vec::with_capacity(chunks.len());
        let mut chunk_ids = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let owner_index = plan.alias_to_owner.get(&index).copied().unwrap_or(index);
            let Some(vector) = vector_by_index.get(&owner_index).cloned() else { continue };

            let mut payload = chunk.payload.clone();
            if owner_index != index {
                payload.aliases = Some(chunks[owner_index].id.to_string());
            }

            points.push(VectorPoint { id: chunk.id.clone(), vector, payload });
            chunk_ids.push(chunk.id.clone());
        }

        report.chunks_upserted += points.len();
        if !points.is_empty() {
            self.store.upsert(collection, points).await?;
        }
        Ok(chunk_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embedding::HashEmbedder;
    use crate::adapters::vector_store::InMemoryVectorStore;

    fn write_file(dir: &std::path::Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    async fn build_indexer() -> (Indexer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ParserRegistry::with_defaults(50));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::with_dimension(16));
        let store: Arc<dyn VectorStoreProvider> = Arc::new(InMemoryVectorStore::new());
        (Indexer::new(registry, embedder, store), dir)
    }

    #[tokio::test]
    async fn full_rebuild_indexes_a_fresh_project() {
        let (indexer, dir) = build_indexer().await;
        write_file(dir.path(), "src/lib.rs", "pub fn add(a: i32, b: i32) -> i32 { a + b }\n");

        let config = ProjectConfig::default();
        let report = indexer
            .index(dir.path(), "default", IndexMode::FullRebuild, &config, IndexOptions::default())
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(report.chunks_upserted > 0);
    }

    #[tokio::test]
    async fn incremental_run_skips_unchanged_files() {
        let (indexer, dir) = build_indexer().await;
        write_file(dir.path(), "src/lib.rs", "pub fn add(a: i32, b: i32) -> i32 { a + b }\n");
        let config = ProjectConfig::default();

        indexer.index(dir.path(), "default", IndexMode::FullRebuild, &config, IndexOptions::default()).await.unwrap();
        let second = indexer.index(dir.path(), "default", IndexMode::Incremental, &config, IndexOptions::default()).await.unwrap();

        assert!(second.files.iter().any(|f| f.path == "src/lib.rs" && f.status == FileStatus::Unchanged));
        assert_eq!(second.chunks_upserted, 0);
    }

    #[tokio::test]
    async fn deleted_file_removes_its_chunks() {
        let (indexer, dir) = build_indexer().await;
        write_file(dir.path(), "src/a.rs", "pub fn a() {}\n");
        let config = ProjectConfig::default();
        indexer.index(dir.path(), "default", IndexMode::FullRebuild, &config, IndexOptions::default()).await.unwrap();

        std::fs::remove_file(dir.path().join("src/a.rs")).unwrap();
        let report = indexer.index(dir.path(), "default", IndexMode::Incremental, &config, IndexOptions::default()).await.unwrap();

        assert!(report.files.iter().any(|f| f.path == "src/a.rs" && f.status == FileStatus::Deleted));
        assert!(report.chunks_deleted > 0);
    }

    #[tokio::test]
    async fn cancellation_before_any_file_is_processed_leaves_state_empty() {
        let (indexer, dir) = build_indexer().await;
        write_file(dir.path(), "src/lib.rs", "pub fn add(a: i32, b: i32) -> i32 { a + b }\n");
        let config = ProjectConfig::default();

        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let options = IndexOptions { cancellation, ..IndexOptions::default() };
        let report = indexer.index(dir.path(), "default", IndexMode::FullRebuild, &config, options).await.unwrap();

        assert!(report.aborted);
        assert_eq!(report.chunks_upserted, 0);

        let reloaded = StateStore::for_collection(dir.path(), "default").load().unwrap();
        assert!(reloaded.files.is_empty());
    }

    #[tokio::test]
    async fn single_file_reindex_preserves_other_files_relations() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ParserRegistry::with_defaults(50));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::with_dimension(16));
        let store: Arc<dyn VectorStoreProvider> = Arc::new(InMemoryVectorStore::new());
        let indexer = Indexer::new(Arc::clone(&registry), Arc::clone(&embedder), Arc::clone(&store));

        write_file(dir.path(), "src/a.rs", "pub fn helper_a() {}\n");
        write_file(dir.path(), "src/b.rs", "pub fn helper_b() {}\n");
        let config = ProjectConfig::default();
        indexer.index(dir.path(), "default", IndexMode::FullRebuild, &config, IndexOptions::default()).await.unwrap();

        // Touch only a.rs and reindex it alone, the way the watcher does
        // for a single changed path.
        write_file(dir.path(), "src/a.rs", "pub fn helper_a() {}\npub fn helper_a2() {}\n");
        let report = indexer
            .index(dir.path(), "default", IndexMode::SingleFile("src/a.rs".to_string()), &config, IndexOptions::default())
            .await
            .unwrap();

        assert_eq!(report.relations_garbage_collected, 0, "b.rs's relations must survive an a.rs-only reindex");

        let b_metadata = store
            .scroll("default", &PayloadFilter { file_path: Some("src/b.rs".to_string()), chunk_kind: Some(ChunkKind::Metadata) })
            .await
            .unwrap();
        assert!(!b_metadata.is_empty(), "src/b.rs's metadata chunks must survive a single-file reindex of src/a.rs");

        let b_contains_relation_survives = store
            .scroll("default", &PayloadFilter { file_path: None, chunk_kind: Some(ChunkKind::Relation) })
            .await
            .unwrap()
            .into_iter()
            .any(|p| p.payload.to.as_deref() == Some("helper_b"));
        assert!(b_contains_relation_survives, "the Contains relation targeting helper_b must survive a single-file reindex of src/a.rs");
    }

    #[tokio::test]
    async fn single_file_reindex_of_a_deleted_file_removes_its_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ParserRegistry::with_defaults(50));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::with_dimension(16));
        let store: Arc<dyn VectorStoreProvider> = Arc::new(InMemoryVectorStore::new());
        let indexer = Indexer::new(Arc::clone(&registry), Arc::clone(&embedder), Arc::clone(&store));

        write_file(dir.path(), "src/a.rs", "pub fn helper_a() {}\n");
        let config = ProjectConfig::default();
        indexer.index(dir.path(), "default", IndexMode::FullRebuild, &config, IndexOptions::default()).await.unwrap();

        std::fs::remove_file(dir.path().join("src/a.rs")).unwrap();
        let report = indexer
            .index(dir.path(), "default", IndexMode::SingleFile("src/a.rs".to_string()), &config, IndexOptions::default())
            .await
            .unwrap();

        assert!(report.files.iter().any(|f| f.path == "src/a.rs" && f.status == FileStatus::Deleted));
        assert!(report.chunks_deleted > 0);

        let remaining = store.scroll("default", &PayloadFilter::by_file("src/a.rs")).await.unwrap();
        assert!(remaining.is_empty(), "src/a.rs's chunks must be gone after its SingleFile run observes the file deleted");

        let reloaded = StateStore::for_collection(dir.path(), "default").load().unwrap();
        assert!(!reloaded.files.contains_key("src/a.rs"), "the deleted file's state entry must be dropped");
    }

    #[tokio::test]
    async fn concurrent_runs_against_the_same_collection_contend_on_the_lock() {
        let (indexer, dir) = build_indexer().await;
        write_file(dir.path(), "src/lib.rs", "pub fn add(a: i32, b: i32) -> i32 { a + b }\n");
        let config = ProjectConfig::default();

        let held = CollectionLock::acquire(&dir.path().join(".semantic-index"), "default").unwrap();
        let err = indexer.index(dir.path(), "default", IndexMode::FullRebuild, &config, IndexOptions::default()).await.unwrap_err();
        assert!(matches!(err, crate::domain::IndexError::Collection { .. }));
        drop(held);
    }
}
