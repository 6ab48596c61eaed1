//! Cross-cutting infrastructure: configuration loading, persisted state,
//! advisory locking, retry policy, and rate limiting.

pub mod atomic_file;
pub mod config;
pub mod rate_limit;
pub mod retry;
pub mod state;
