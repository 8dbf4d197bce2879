use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the typed-middleware CLI
///
/// Diagnostics go to stderr so `--stdout` output stays clean.
///
/// The log level can be controlled via the RUST_LOG environment variable:
/// - RUST_LOG=debug typed-middleware AppStack  (resolution details)
/// - RUST_LOG=trace typed-middleware AppStack  (every ordering step)
///
/// Without RUST_LOG, each `-v` raises the default level one step from `warn`.
pub fn init(verbosity: u8) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("typed_middleware={level},typed_middleware_cli={level}")
}
