//! File watcher (C8): a long-lived task that debounces filesystem
//! events per path and re-indexes exactly the file that changed.
//!
//! Each watched path runs its own `Idle -> Pending -> Running -> Idle`
//! state machine. An edit that arrives while a path is `Running` bumps
//! its generation counter rather than spawning a second worker, so the
//! path falls back to `Pending` and re-indexes once more after the
//! in-flight run finishes, per `SPEC_FULL.md` §4.8.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::indexer::{IndexOptions, Indexer};
use crate::application::report::IndexMode;
use crate::domain::Result;
use crate::infrastructure::config::ProjectConfig;

/// Per-path debounce bookkeeping. `generation` is bumped on every raw
/// event; a pending or running worker compares its captured generation
/// against the live one to decide whether to fire or loop back.
struct PathState {
    generation: AtomicU64,
    task_active: AtomicBool,
}

/// Owns the raw `notify` watcher and the per-path debounce workers built
/// on top of it.
pub struct Watcher {
    indexer: Arc<Indexer>,
    project_root: PathBuf,
    collection: String,
    config: ProjectConfig,
    debounce: Duration,
    paths: Arc<DashMap<String, Arc<PathState>>>,
}

impl Watcher {
    /// Build a watcher for `collection` rooted at `project_root`, using
    /// `config.debounce_seconds` as the settle time for rapid edits.
    pub fn new(indexer: Arc<Indexer>, project_root: PathBuf, collection: impl Into<String>, config: ProjectConfig) -> Self {
        let debounce = Duration::from_secs_f64(config.debounce_seconds.max(0.0));
        Self { indexer, project_root, collection: collection.into(), config, debounce, paths: Arc::new(DashMap::new()) }
    }

    /// Run until `shutdown` resolves. Pending debounce timers are
    /// cancelled on shutdown; any run already `Running` is left to
    /// finish rather than aborted mid-upsert.
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<PathBuf>(256);
        let root = self.project_root.clone();

        let mut raw_watcher: RecommendedWatcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            let Ok(event) = event else { return };
            for path in event.paths {
                let _ = tx.blocking_send(path);
            }
        })
        .map_err(|err| crate::domain::IndexError::fatal(format!("failed to start file watcher: {err}")))?;

        raw_watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|err| crate::domain::IndexError::fatal(format!("failed to watch {}: {err}", root.display())))?;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("watcher shutting down; pending debounce timers dropped");
                    return Ok(());
                }
                Some(path) = rx.recv() => {
                    self.handle_raw_event(path);
                }
            }
        }
    }

    fn handle_raw_event(&self, absolute_path: PathBuf) {
        let Ok(relative) = absolute_path.strip_prefix(&self.project_root) else { return };
        let relative_path = crate::domain::entity::normalize_path(&relative.to_string_lossy());

        if !self.is_relevant(&relative_path) {
            return;
        }

        let state = self.paths.entry(relative_path.clone()).or_insert_with(|| {
            Arc::new(PathState { generation: AtomicU64::new(0), task_active: AtomicBool::new(false) })
        });
        let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if state.task_active.swap(true, Ordering::SeqCst) {
            // Already Pending or Running for this path; the bumped
            // generation alone is enough to trigger a re-run.
            return;
        }

        let indexer = Arc::clone(&self.indexer);
        let project_root = self.project_root.clone();
        let collection = self.collection.clone();
        let config = self.config.clone();
        let debounce = self.debounce;
        let state = Arc::clone(&state);
        let path_for_task = relative_path.clone();

        tokio::spawn(async move {
            let mut awaited_generation = generation;
            loop {
                tokio::time::sleep(debounce).await;
                let current = state.generation.load(Ordering::SeqCst);
                if current != awaited_generation {
                    // More edits landed during the debounce window; wait again.
                    awaited_generation = current;
                    continue;
                }

                let before_run = current;
                let mode = IndexMode::SingleFile(path_for_task.clone());
                if let Err(err) = indexer.index(&project_root, &collection, mode, &config, IndexOptions::default()).await {
                    warn!(path = %path_for_task, error = %err, "watcher re-index failed");
                }

                let after_run = state.generation.load(Ordering::SeqCst);
                if after_run != before_run {
                    // Edited again while Running; fall back to Pending.
                    awaited_generation = after_run;
                    continue;
                }
                break;
            }
            state.task_active.store(false, Ordering::SeqCst);
        });
    }

    fn is_relevant(&self, relative_path: &str) -> bool {
        let include: Vec<glob::Pattern> = self.config.include_patterns.iter().filter_map(|p| glob::Pattern::new(p).ok()).collect();
        let exclude: Vec<glob::Pattern> = self.config.exclude_patterns.iter().filter_map(|p| glob::Pattern::new(p).ok()).collect();
        include.iter().any(|p| p.matches(relative_path)) && !exclude.iter().any(|p| p.matches(relative_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_indexer() -> Indexer {
        use crate::adapters::embedding::HashEmbedder;
        use crate::adapters::parsers::registry::ParserRegistry;
        use crate::adapters::vector_store::InMemoryVectorStore;

        Indexer::new(
            Arc::new(ParserRegistry::with_defaults(50)),
            Arc::new(HashEmbedder::with_dimension(8)),
            Arc::new(InMemoryVectorStore::new()),
        )
    }

    #[test]
    fn relevance_filter_matches_config_patterns() {
        let mut config = ProjectConfig::default();
        config.include_patterns = vec!["**/*.rs".to_string()];
        config.exclude_patterns = vec!["target/**".to_string()];

        let watcher = Watcher::new(Arc::new(test_indexer()), PathBuf::from("/tmp/project"), "default", config);

        assert!(watcher.is_relevant("src/lib.rs"));
        assert!(!watcher.is_relevant("target/debug/build.rs"));
    }
}
