use typed_middleware_cli::commands::{self, GenerateOptions, Generated};
use typed_middleware_cli::{Emit, config, logging};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "typed-middleware",
    about = "Compile a middleware stack contract into an ordered, short-circuiting pipeline",
    version
)]
struct Cli {
    /// Stack contract to compile (e.g., AppStack)
    root: String,

    /// Rust source declaring the stack, relative to --dir
    #[arg(long, short = 's', env = "TYPED_MIDDLEWARE_FILE", value_name = "FILE")]
    source: Option<PathBuf>,

    /// Working directory (defaults to current directory)
    #[arg(long, short = 'd', value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Package the stack contract is declared in
    #[arg(long, default_value = "self")]
    scope: String,

    /// Read symbols from a JSON manifest instead of parsing --source
    #[arg(long, value_name = "FILE")]
    symbols: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "rust")]
    emit: Emit,

    /// Print the output instead of writing it beside the source
    #[arg(long)]
    stdout: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let config = config::load_config(&dir)?;

    let options = GenerateOptions {
        dir,
        source: cli.source,
        symbols: cli.symbols,
        root: cli.root,
        scope: cli.scope,
        emit: cli.emit,
        stdout: cli.stdout,
    };

    if let Generated::Written(path) = commands::generate(&options, &config)? {
        println!("Generated {}", path.display());
    }

    Ok(())
}
