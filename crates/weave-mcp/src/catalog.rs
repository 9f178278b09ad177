//! Translation of `tools/list` results into host tool definitions.

use serde_json::Value;
use weave_core::{EXTERNAL_CATEGORY, McpError, ParameterType, ToolDefinition, ToolParameter};

/// Parse a `tools/list` result.
///
/// A result object without `tools` is an empty catalog. A result that is not
/// an object, a `tools` member that is not an array, or an entry without a
/// string `name` is a protocol error. Parameters follow the declaration order
/// of `inputSchema.properties`.
pub fn parse_tools(server: &str, result: &Value) -> Result<Vec<ToolDefinition>, McpError> {
    let Some(result) = result.as_object() else {
        return Err(McpError::protocol(
            server,
            format!("tools/list result is not an object: {result}"),
        ));
    };
    let tools = match result.get("tools") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(tools)) => tools,
        Some(other) => {
            return Err(McpError::protocol(
                server,
                format!("tools/list 'tools' is not an array: {other}"),
            ));
        }
    };

    tools
        .iter()
        .enumerate()
        .map(|(index, tool)| parse_tool(server, index, tool))
        .collect()
}

fn parse_tool(server: &str, index: usize, tool: &Value) -> Result<ToolDefinition, McpError> {
    let name = tool
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| McpError::protocol(server, format!("tool #{index} has no name")))?;

    let description = tool
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ToolDefinition {
        name: name.to_string(),
        description,
        parameters: tool
            .get("inputSchema")
            .map(parse_parameters)
            .unwrap_or_default(),
        category: EXTERNAL_CATEGORY.to_string(),
        server: server.to_string(),
    })
}

fn parse_parameters(schema: &Value) -> Vec<ToolParameter> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| ToolParameter {
            name: name.clone(),
            param_type: ParameterType::from_schema_type(schema_type(property)),
            description: property
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            required: required.contains(&name.as_str()),
        })
        .collect()
}

/// `type` may be a string or, for nullable fields, an array such as
/// `["integer", "null"]`; the first non-null entry wins.
fn schema_type(property: &Value) -> Option<&str> {
    match property.get("type")? {
        Value::String(kind) => Some(kind),
        Value::Array(kinds) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null"),
        _ => None,
    }
}
