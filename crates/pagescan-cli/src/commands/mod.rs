//! Subcommand implementations.

pub mod config;
pub mod engine;
pub mod extract;

use std::path::{Path, PathBuf};

use tracing::debug;

use pagescan_core::PagescanConfig;

/// `<config dir>/pagescan/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagescan")
        .join("config.json")
}

/// The file a command reads its configuration from.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration.
///
/// An explicit path must exist. The default location is optional and falls
/// back to built-in defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<PagescanConfig> {
    if let Some(path) = explicit {
        debug!("Loading config from {}", path);
        return Ok(PagescanConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(PagescanConfig::from_file(&path)?)
    } else {
        Ok(PagescanConfig::default())
    }
}
