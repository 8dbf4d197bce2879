//! Configuration management for typed-middleware
//!
//! ## Architecture
//!
//! - `schema` - Configuration data structures and validation
//! - `io` - Reading and layering config files
//! - `paths` - Config file locations
//!
//! ## Usage
//!
//! ```rust
//! use typed_middleware_cli::config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = config::load_config(std::path::Path::new("."))?;
//! println!("implementations end in {}", config.conventions.implementation_suffix);
//! # Ok(())
//! # }
//! ```

pub mod io;
pub mod paths;
pub mod schema;

pub use io::{load_config, load_layers};
pub use paths::{PROJECT_CONFIG_FILE, get_config_dir, get_project_config_path, get_user_config_path};
pub use schema::{ConfigLayer, GeneratorConfig, OutputConfig};
