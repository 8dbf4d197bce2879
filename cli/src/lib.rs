pub mod codegen;
pub mod commands;
pub mod config;
pub mod logging;
pub mod source;
pub mod types;

pub use types::Emit;
