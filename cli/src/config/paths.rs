//! Configuration file locations
//!
//! The user-wide file lives in the platform config directory; a project
//! file sits in the directory the generator runs in.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File name of the project-level configuration
pub const PROJECT_CONFIG_FILE: &str = "typed-middleware.toml";

/// Get the base configuration directory (~/.config/typed-middleware/)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Failed to get config directory")?
        .join("typed-middleware"))
}

/// Get the user config file path (~/.config/typed-middleware/config.toml)
pub fn get_user_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Get the project config file path inside `dir`
pub fn get_project_config_path(dir: &Path) -> PathBuf {
    dir.join(PROJECT_CONFIG_FILE)
}
