//! Servers command handler.
//!
//! Displays every configured tool server. Nothing is started.

use weave_mcp::McpService;

use crate::error::CliError;
use crate::presentation::{format_optional, print_separator, truncate_string};

/// Execute the servers command.
pub fn execute(service: &McpService) -> Result<(), CliError> {
    let servers = service.list_servers();

    if servers.is_empty() {
        println!("No tool servers configured.");
        println!("Add an 'mcp_servers' section to ~/.weave/mcp_config.yaml or pass --config.");
        return Ok(());
    }

    println!("Found {} tool server(s):\n", servers.len());
    println!(
        "{:<20} {:<8} {:<40} Description",
        "Name", "Enabled", "Command"
    );
    print_separator(100);

    for server in servers {
        let command_line = std::iter::once(server.command.as_str())
            .chain(server.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let description = (!server.description.is_empty()).then_some(&server.description);

        println!(
            "{:<20} {:<8} {:<40} {}",
            truncate_string(&server.name, 19),
            if server.enabled { "yes" } else { "no" },
            truncate_string(&command_line, 39),
            format_optional(description, "--"),
        );
    }

    Ok(())
}
