//! Application layer: the orchestration that sits on top of the domain,
//! ports, and adapters — discovery, deduplication, garbage collection,
//! the indexer core (C7), its report, and the file watcher (C8).

pub mod dedup;
pub mod discovery;
pub mod gc;
pub mod indexer;
pub mod report;
pub mod watcher;

pub use dedup::{count_deduplicated, plan_deduplication, DedupPlan};
pub use discovery::{discover, DiscoveredFile};
pub use gc::collect_orphans;
pub use indexer::{IndexOptions, Indexer};
pub use report::{ClearingPolicy, FileError, FileOutcome, FileStatus, IndexMode, IndexReport};
pub use watcher::Watcher;
