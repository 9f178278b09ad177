//! Tools command handler.
//!
//! Starts one server, discovers its tools and prints them.

use weave_mcp::{McpService, ParameterType, ToolDefinition};

use crate::error::CliError;
use crate::presentation::truncate_string;

/// Execute the tools command.
pub async fn execute(service: &McpService, server: &str, json: bool) -> Result<(), CliError> {
    let tools = service.get_tools(server).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&tools)
            .map_err(|e| CliError::Protocol(format!("cannot render tools: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    if tools.is_empty() {
        println!("'{server}' advertises no tools.");
        return Ok(());
    }

    println!("'{server}' advertises {} tool(s):\n", tools.len());
    for tool in &tools {
        print_tool(tool);
    }
    Ok(())
}

fn print_tool(tool: &ToolDefinition) {
    println!("{}  {}", tool.name, truncate_string(&tool.description, 80));
    for param in &tool.parameters {
        let required = if param.required { " (required)" } else { "" };
        println!(
            "    {}: {}{required}  {}",
            param.name,
            type_label(param.param_type),
            truncate_string(&param.description, 60)
        );
    }
}

const fn type_label(param_type: ParameterType) -> &'static str {
    match param_type {
        ParameterType::String => "STRING",
        ParameterType::Number => "NUMBER",
        ParameterType::Boolean => "BOOLEAN",
        ParameterType::Array => "ARRAY",
        ParameterType::Object => "OBJECT",
    }
}
