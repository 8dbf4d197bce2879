//! The `generate` command: compile one stack and emit it
//!
//! Symbols come either from a Rust source file or from a JSON manifest in
//! the [`InMemorySymbolTable`] format. Output is written beside the source
//! as `<stem><suffix>.<ext>`, or printed when `stdout` is set. Nothing is
//! written if any step fails.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};
use typed_middleware::{CompiledStack, InMemorySymbolTable, compile};

use crate::codegen;
use crate::config::GeneratorConfig;
use crate::source;
use crate::types::Emit;

/// Inputs of one generation run
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Directory relative source paths are resolved against
    pub dir: PathBuf,
    /// Rust source declaring the stack
    pub source: Option<PathBuf>,
    /// Symbol manifest; takes precedence over `source`
    pub symbols: Option<PathBuf>,
    /// Stack contract to compile
    pub root: String,
    pub scope: String,
    pub emit: Emit,
    pub stdout: bool,
}

/// What a run produced
#[derive(Debug)]
pub enum Generated {
    Written(PathBuf),
    Printed,
}

/// Compile the stack and write or print the result
pub fn generate(options: &GenerateOptions, config: &GeneratorConfig) -> Result<Generated> {
    let (table, input) = load_symbols(options)?;

    let compiled = compile(&table, &config.conventions, &options.scope, &options.root)
        .with_context(|| format!("Failed to compile {} from {}", options.root, input.display()))?;
    info!(
        root = %compiled.pipeline.target,
        components = compiled.graph.len(),
        "compiled stack"
    );

    let output = render(&compiled, &table, config, options.emit, &input)?;

    if options.stdout {
        print!("{output}");
        return Ok(Generated::Printed);
    }

    let path = output_path(&input, &config.output.suffix, options.emit)?;
    fs::write(&path, output).context(format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "wrote generated output");

    Ok(Generated::Written(path))
}

fn load_symbols(options: &GenerateOptions) -> Result<(InMemorySymbolTable, PathBuf)> {
    if let Some(symbols) = &options.symbols {
        let path = options.dir.join(symbols);
        let content = fs::read_to_string(&path)
            .context(format!("Failed to read symbols: {}", path.display()))?;
        let table: InMemorySymbolTable = serde_json::from_str(&content)
            .context(format!("Failed to parse symbols: {}", path.display()))?;
        return Ok((table, path));
    }

    let Some(source) = &options.source else {
        anyhow::bail!("no source file given: pass --source or set TYPED_MIDDLEWARE_FILE");
    };
    let path = options.dir.join(source);
    let table = source::load_file(&path)?;
    Ok((table, path))
}

fn render(
    compiled: &CompiledStack,
    table: &InMemorySymbolTable,
    config: &GeneratorConfig,
    emit: Emit,
    input: &Path,
) -> Result<String> {
    match emit {
        Emit::Rust => {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            codegen::render_stack(compiled, table, config, &name)
        }
        Emit::Json => {
            let mut json = serde_json::to_string_pretty(compiled)
                .context("Failed to serialize compiled stack")?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// `src/app.rs` → `src/app_middleware.rs`
fn output_path(input: &Path, suffix: &str, emit: Emit) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .context(format!("{} has no file name", input.display()))?;

    let mut name = stem.to_os_string();
    name.push(suffix);
    name.push(".");
    name.push(emit.extension());
    Ok(input.with_file_name(name))
}
