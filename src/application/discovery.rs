//! File discovery: walks a project root, applying the project config's
//! include/exclude glob patterns and `max_file_size` cutoff, and
//! normalizes every surviving path relative to the root (C7 step 1).

use std::path::Path;

use glob::Pattern;
use ignore::WalkBuilder;
use tracing::{debug, instrument};

use crate::domain::Result;
use crate::infrastructure::config::ProjectConfig;

/// A discovered file, ready to be diffed against the state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Project-relative, normalized path.
    pub relative_path: String,
    /// Absolute path on disk, for reading content.
    pub absolute_path: std::path::PathBuf,
}

/// Result of one discovery walk: the files to diff, plus the paths
/// rejected for exceeding `max_file_size` — a per-file error per
/// `SPEC_FULL.md` §7/§8, not a silent drop.
#[derive(Debug, Default)]
pub struct DiscoveryResult {
    /// Files that passed every include/exclude/size gate.
    pub files: Vec<DiscoveredFile>,
    /// Relative paths skipped for exceeding `max_file_size`.
    pub oversized: Vec<String>,
}

/// Walk `project_root`, respecting `.gitignore` (via the `ignore` crate,
/// matching the teacher's discovery style) plus the project's own
/// include/exclude glob patterns and size cutoff.
#[instrument(skip(config))]
pub fn discover(project_root: &Path, config: &ProjectConfig) -> Result<DiscoveryResult> {
    let include: Vec<Pattern> = config.include_patterns.iter().filter_map(|p| Pattern::new(p).ok()).collect();
    let exclude: Vec<Pattern> = config.exclude_patterns.iter().filter_map(|p| Pattern::new(p).ok()).collect();

    let mut result = DiscoveryResult::default();
    let walker = WalkBuilder::new(project_root).hidden(false).git_ignore(true).build();

    for entry in walker {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let absolute_path = entry.path().to_path_buf();
        let Ok(relative) = absolute_path.strip_prefix(project_root) else { continue };
        let relative_path = crate::domain::entity::normalize_path(&relative.to_string_lossy());

        if !include.iter().any(|p| p.matches(&relative_path)) {
            continue;
        }
        if exclude.iter().any(|p| p.matches(&relative_path)) {
            continue;
        }
        if let Ok(metadata) = std::fs::metadata(&absolute_path) {
            if metadata.len() > config.max_file_size {
                result.oversized.push(relative_path);
                continue;
            }
        }

        result.files.push(DiscoveredFile { relative_path, absolute_path });
    }

    result.files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    debug!(discovered = result.files.len(), oversized = result.oversized.len(), "file discovery complete");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_included_files_and_skips_excluded_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        std::fs::create_dir_all(dir.path().join("target")).unwrap();
        std::fs::write(dir.path().join("target").join("artifact.rs"), "// built").unwrap();

        let config = ProjectConfig::default();
        let result = discover(dir.path(), &config).unwrap();

        assert!(result.files.iter().any(|f| f.relative_path == "main.rs"));
        assert!(!result.files.iter().any(|f| f.relative_path.starts_with("target/")));
    }

    #[test]
    fn skips_files_larger_than_max_file_size_and_reports_them() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), vec![0u8; 1024]).unwrap();

        let mut config = ProjectConfig::default();
        config.max_file_size = 10;
        let result = discover(dir.path(), &config).unwrap();

        assert!(!result.files.iter().any(|f| f.relative_path == "big.txt"));
        assert!(result.oversized.iter().any(|p| p == "big.txt"));
    }
}
