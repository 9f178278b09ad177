//! Call command handler.

use serde_json::{Map, Value};
use weave_mcp::{McpService, ToolCallOutcome};

use crate::error::CliError;

/// Parse `--args` into an argument object. Absent means `{}`.
pub fn parse_arguments(raw: Option<&str>) -> Result<Map<String, Value>, CliError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CliError::Arguments(format!(
            "--args must be a JSON object, got: {other}"
        ))),
        Err(e) => Err(CliError::Arguments(format!("--args is not valid JSON: {e}"))),
    }
}

/// Execute the call command.
///
/// Prints the result as pretty JSON. A tool-reported error is returned as
/// `CliError::RemoteTool`.
pub async fn execute(
    service: &McpService,
    server: &str,
    tool: &str,
    raw_args: Option<&str>,
) -> Result<(), CliError> {
    let arguments = parse_arguments(raw_args)?;

    match service.call_tool(server, tool, arguments).await? {
        ToolCallOutcome::Success(value) => {
            let rendered = serde_json::to_string_pretty(&value)
                .map_err(|e| CliError::Protocol(format!("cannot render result: {e}")))?;
            println!("{rendered}");
            Ok(())
        }
        ToolCallOutcome::RemoteError(err) => {
            if let Some(data) = &err.data {
                eprintln!("{data}");
            }
            Err(CliError::RemoteTool(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments(None).unwrap().is_empty());

        let map = parse_arguments(Some(r#"{"path": "/tmp", "depth": 2}"#)).unwrap();
        assert_eq!(map["path"], "/tmp");
        assert_eq!(map["depth"], 2);

        assert!(matches!(parse_arguments(Some("[1, 2]")), Err(CliError::Arguments(_))));
        assert!(matches!(parse_arguments(Some("{oops")), Err(CliError::Arguments(_))));
    }
}
