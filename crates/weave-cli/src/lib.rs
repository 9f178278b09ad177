//! Command-line host for the weave tool-server client.
//!
//! `main.rs` parses arguments, loads `.env`, installs logging and calls
//! [`run`]. Everything else lives here so it can be tested.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Only main.rs installs the subscriber
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap, load_env};
pub use commands::Commands;
pub use error::{CliError, exit_code_for};
pub use parser::Cli;

/// Run one command inside a scoped service.
///
/// Servers started by the command are stopped before this returns, on
/// success and on error alike.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = bootstrap(&CliConfig::from(&cli)).await?;

    ctx.service
        .scoped(|service| async move {
            match cli.command {
                Commands::Servers => handlers::servers::execute(service),
                Commands::Tools { server, json } => {
                    handlers::tools::execute(service, &server, json).await
                }
                Commands::Call { server, tool, args } => {
                    handlers::call::execute(service, &server, &tool, args.as_deref()).await
                }
                Commands::Check => handlers::check::execute(service).await,
            }
        })
        .await?;

    Ok(())
}
