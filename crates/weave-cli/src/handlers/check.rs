//! Check command handler.
//!
//! Starts every enabled server one at a time, reports its tool count or the
//! failure, then stops it again.

use weave_mcp::McpService;

use crate::error::CliError;
use crate::presentation::{print_separator, truncate_string};

/// Execute the check command.
pub async fn execute(service: &McpService) -> Result<(), CliError> {
    let servers = service.list_servers();
    if servers.is_empty() {
        println!("No tool servers configured.");
        return Ok(());
    }

    println!("{:<20} {:<8} Details", "Server", "Result");
    print_separator(80);

    let mut failed = 0usize;
    for server in servers {
        if !server.enabled {
            println!("{:<20} {:<8} disabled", truncate_string(&server.name, 19), "skip");
            continue;
        }

        match service.get_tools(&server.name).await {
            Ok(tools) => {
                let pid = service
                    .status(&server.name)
                    .ok()
                    .and_then(|status| status.pid)
                    .map_or_else(String::new, |pid| format!(" (pid {pid})"));
                println!(
                    "{:<20} {:<8} {} tool(s){pid}",
                    truncate_string(&server.name, 19),
                    "ok",
                    tools.len()
                );
            }
            Err(e) => {
                failed += 1;
                tracing::debug!(server = %server.name, error = %e, "Check failed");
                println!("{:<20} {:<8} {e}", truncate_string(&server.name, 19), "FAIL");
            }
        }

        service.stop(&server.name).await?;
    }

    if failed > 0 {
        return Err(CliError::Unhealthy(failed));
    }
    Ok(())
}
