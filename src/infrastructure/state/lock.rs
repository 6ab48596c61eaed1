//! Advisory per-collection, per-machine locking via POSIX `flock`, so two
//! indexer runs against the same collection never interleave writes
//! (`SPEC_FULL.md` §4.4/§5).

use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};

use nix::fcntl::{flock, FlockArg};

use crate::domain::{IndexError, Result};

/// Holds an exclusive, non-blocking advisory lock on a sibling `.lock`
/// file for as long as it lives; the lock is released when the file
/// handle is dropped (process exit also releases it).
pub struct CollectionLock {
    _file: File,
    path: PathBuf,
}

impl CollectionLock {
    /// Try to acquire the lock for `collection` under `state_dir`,
    /// failing immediately (rather than blocking) if another process
    /// already holds it.
    pub fn acquire(state_dir: &Path, collection: &str) -> Result<Self> {
        std::fs::create_dir_all(state_dir)?;
        let path = state_dir.join(format!("{collection}.lock"));
        let file = OpenOptions::new().create(true).truncate(false).write(true).open(&path)?;

        flock(file.as_fd(), FlockArg::LockExclusiveNonblock).map_err(|errno| {
            IndexError::collection(format!(
                "collection {collection} is already locked by another indexer run ({errno})"
            ))
        })?;

        Ok(Self { _file: file, path })
    }

    /// Path to the lock file, for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        let _ = flock(self._file.as_fd(), FlockArg::UnlockNonblock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_on_same_collection_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let first = CollectionLock::acquire(dir.path(), "default").unwrap();
        let second = CollectionLock::acquire(dir.path(), "default");
        assert!(second.is_err());
        drop(first);
        let third = CollectionLock::acquire(dir.path(), "default");
        assert!(third.is_ok());
    }

    #[test]
    fn different_collections_do_not_contend() {
        let dir = tempfile::tempdir().unwrap();
        let a = CollectionLock::acquire(dir.path(), "alpha").unwrap();
        let b = CollectionLock::acquire(dir.path(), "beta").unwrap();
        drop(a);
        drop(b);
    }
}
