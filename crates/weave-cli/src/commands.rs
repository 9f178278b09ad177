//! Subcommands of the `weave-mcp` tool.

use clap::Subcommand;

/// Available commands.
///
/// Every command runs inside a scoped service: servers it starts are stopped
/// before the process exits.
#[derive(Subcommand)]
pub enum Commands {
    /// List configured tool servers
    Servers,

    /// Start a server and list the tools it advertises
    Tools {
        /// Server name
        server: String,
        /// Print the tool definitions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Call a tool and print its result
    Call {
        /// Server name
        server: String,
        /// Tool name
        tool: String,
        /// Arguments as a JSON object (e.g. '{"path": "/tmp"}')
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Start every enabled server and report what it offers
    Check,
}
