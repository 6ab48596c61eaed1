//! Atomic write-temp/fsync/rename helper shared by the state store (C4)
//! and the filesystem vector store (C6), so both persist their JSON
//! documents with the same crash-safety discipline.

use std::io::Write;
use std::path::Path;

use crate::domain::Result;

/// Write `contents` to `path` atomically: write to a sibling `.tmp` file,
/// `fsync` it, then rename over the destination. A crash mid-write leaves
/// the original file (or no file) intact, never a half-written one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension(format!("{}.tmp", path.extension().and_then(|e| e.to_str()).unwrap_or("json")));

    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_overwrites_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"{\"a\":1}").unwrap();
        write_atomic(&path, b"{\"a\":2}").unwrap();
        let read = std::fs::read_to_string(&path).unwrap();
        assert_eq!(read, "{\"a\":2}");
    }

    #[test]
    fn leaves_no_tmp_file_behind_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"{}").unwrap();
        let tmp = path.with_extension("json.tmp");
        assert!(!tmp.exists());
    }
}
