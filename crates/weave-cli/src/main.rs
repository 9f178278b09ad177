//! `weave-mcp` entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use weave_cli::{Cli, exit_code_for, load_env};

/// Log to stderr so stdout carries only command output.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Environment first: RUST_LOG and WEAVE_MCP_* may come from .env
    let env_file = load_env(cli.env_file.as_deref());
    init_tracing(cli.verbose);

    let result = match env_file {
        Ok(path) => {
            if let Some(path) = path {
                tracing::debug!(path = %path.display(), "Loaded environment file");
            }
            weave_cli::run(cli).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
