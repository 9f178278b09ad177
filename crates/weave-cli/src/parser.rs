//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for inspecting and calling stdio tool servers.
#[derive(Parser)]
#[command(name = "weave-mcp")]
#[command(about = "List, inspect and call stdio tool servers")]
#[command(version)]
pub struct Cli {
    /// Primary configuration file (JSON or YAML) with an `mcp_servers` map
    #[arg(long = "config", global = true, env = "WEAVE_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Secondary server file [default: ~/.weave/mcp_config.yaml]
    #[arg(long = "servers-file", global = true)]
    pub servers_file: Option<PathBuf>,

    /// Load environment variables from this file instead of .agent/.env or .env
    #[arg(long = "env-file", global = true)]
    pub env_file: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "weave-mcp",
            "servers",
            "--verbose",
            "--config",
            "/tmp/agent.yaml",
            "--servers-file",
            "/tmp/servers.yaml",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/agent.yaml")));
        assert_eq!(cli.servers_file, Some(PathBuf::from("/tmp/servers.yaml")));
        assert!(matches!(cli.command, Commands::Servers));
    }

    #[test]
    fn test_call_args() {
        let cli = Cli::parse_from([
            "weave-mcp",
            "call",
            "files",
            "read_file",
            "--args",
            r#"{"path": "/tmp/x"}"#,
        ]);
        match cli.command {
            Commands::Call { server, tool, args } => {
                assert_eq!(server, "files");
                assert_eq!(tool, "read_file");
                assert_eq!(args.as_deref(), Some(r#"{"path": "/tmp/x"}"#));
            }
            _ => panic!("expected call command"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["weave-mcp"]).is_err());
    }
}
