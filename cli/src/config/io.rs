//! Configuration file I/O
//!
//! Layers are applied in order: built-in defaults, the user config file,
//! then the project config file. The merged result is validated once.

use super::paths::{get_project_config_path, get_user_config_path};
use super::schema::{ConfigLayer, GeneratorConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load the effective configuration for a generator run in `project_dir`
///
/// Missing files are skipped. A user config directory that cannot be
/// determined is treated as having no user config.
pub fn load_config(project_dir: &Path) -> Result<GeneratorConfig> {
    let mut layers = Vec::new();
    if let Ok(path) = get_user_config_path() {
        layers.push(path);
    }
    layers.push(get_project_config_path(project_dir));

    load_layers(&layers)
}

/// Merge config files over the defaults, in order
pub fn load_layers<P: AsRef<Path>>(paths: &[P]) -> Result<GeneratorConfig> {
    let mut config = GeneratorConfig::default();

    for path in paths {
        if let Some(layer) = read_layer(path.as_ref())? {
            debug!(path = %path.as_ref().display(), "applying config layer");
            config.merge(layer);
        }
    }

    if let Err(errors) = config.validate() {
        anyhow::bail!("Config validation failed:\n  {}", errors.join("\n  "));
    }

    Ok(config)
}

/// Read one layer, or `None` if the file doesn't exist
fn read_layer(path: &Path) -> Result<Option<ConfigLayer>> {
    if !path.exists() {
        return Ok(None);
    }

    let content =
        fs::read_to_string(path).context(format!("Failed to read config: {}", path.display()))?;

    let layer: ConfigLayer =
        toml::from_str(&content).context(format!("Failed to parse config: {}", path.display()))?;

    Ok(Some(layer))
}
