//! Project configuration loading (C10).

pub mod loader;
pub mod types;

pub use loader::{default_config_toml, ConfigLoader};
pub use types::{GlobalConfig, ProjectConfig};
