//! Layered project configuration loading (C10).
//!
//! Precedence, highest first: explicit call args > environment variables
//! > `<project_root>/.semantic-index/config.toml` > embedded defaults.
//! Grounded directly in the teacher's `infrastructure::config::loader`.

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, FileFormat};
use validator::Validate;

use super::types::GlobalConfig;
use crate::domain::Result;

/// Embedded default configuration, the base layer of every load.
const DEFAULT_CONFIG_TOML: &str = include_str!("../../../config/default.toml");

/// Returns the embedded default config TOML, exposed for tests that
/// verify the defaults parse and validate on their own.
pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}

/// Loads and validates [`GlobalConfig`] by layering the embedded
/// defaults, an optional per-project config file, and environment
/// variables (prefix `SEMANTIC_INDEX`, `__`-separated).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Construct a loader. Stateless; safe to share.
    pub fn new() -> Self {
        Self
    }

    /// Load defaults and environment overrides only, with no per-project
    /// file layer. Used when a project has not opted into its own config.
    pub fn load(&self) -> Result<GlobalConfig> {
        self.build(None)
    }

    /// Load defaults, then `<project_root>/.semantic-index/config.toml`
    /// if present, then environment overrides.
    pub fn load_for_project(&self, project_root: &Path) -> Result<GlobalConfig> {
        let candidate = project_root.join(".semantic-index").join("config.toml");
        self.build(Some(candidate))
    }

    fn build(&self, project_file: Option<std::path::PathBuf>) -> Result<GlobalConfig> {
        let mut builder = ConfigBuilder::builder().add_source(config::File::from_str(DEFAULT_CONFIG_TOML, FileFormat::Toml));

        if let Some(path) = project_file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("SEMANTIC_INDEX").separator("__").try_parsing(true));

        let built = builder.build()?;
        let config: GlobalConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let loader = ConfigLoader::new();
        let config = loader.load().unwrap();
        assert_eq!(config.default_collection, "default");
        assert!(config.project.max_file_size > 0);
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".semantic-index")).unwrap();
        std::fs::write(
            dir.path().join(".semantic-index").join("config.toml"),
            "default_collection = \"custom\"\n[project]\nmax_file_size = 1024\n",
        )
        .unwrap();

        let loader = ConfigLoader::new();
        let config = loader.load_for_project(dir.path()).unwrap();
        assert_eq!(config.default_collection, "custom");
        assert_eq!(config.project.max_file_size, 1024);
    }

    #[test]
    fn missing_project_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new();
        let config = loader.load_for_project(dir.path()).unwrap();
        assert_eq!(config.default_collection, "default");
    }

    #[test]
    fn unknown_project_key_is_rejected_not_silently_dropped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".semantic-index")).unwrap();
        std::fs::write(
            dir.path().join(".semantic-index").join("config.toml"),
            "[project]\nmax_file_size = 1024\nnot_a_real_key = true\n",
        )
        .unwrap();

        let loader = ConfigLoader::new();
        assert!(loader.load_for_project(dir.path()).is_err());
    }
}
