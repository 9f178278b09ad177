//! Tool catalog domain types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category tag carried by every tool discovered from a tool server.
pub const EXTERNAL_CATEGORY: &str = "external";

/// Parameter type in the host's tool representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterType {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    /// Map a JSON Schema `type` value.
    ///
    /// `integer` folds into `Number`; anything unknown or absent is `String`.
    pub fn from_schema_type(schema_type: Option<&str>) -> Self {
        match schema_type {
            Some("number" | "integer") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array,
            Some("object") => Self::Object,
            _ => Self::String,
        }
    }
}

/// One input parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub description: String,
    pub required: bool,
}

/// A tool advertised by a tool server.
///
/// `server` identifies the originating server, so identically-named tools
/// from different servers stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    pub category: String,
    pub server: String,
}

impl ToolDefinition {
    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Names of all required parameters, in declaration order.
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }
}

/// Structured application error returned by a tool server for a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for RemoteToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Outcome of a tool invocation that reached the peer.
///
/// A remote error is a legitimate answer from the tool server, not an
/// infrastructure failure, so it is a value here rather than an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolCallOutcome {
    Success(Value),
    RemoteError(RemoteToolError),
}

impl ToolCallOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Convert into a `Result`, for callers that want to `?` remote errors.
    pub fn into_result(self) -> Result<Value, RemoteToolError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::RemoteError(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_type_mapping() {
        assert_eq!(ParameterType::from_schema_type(Some("string")), ParameterType::String);
        assert_eq!(ParameterType::from_schema_type(Some("number")), ParameterType::Number);
        assert_eq!(ParameterType::from_schema_type(Some("integer")), ParameterType::Number);
        assert_eq!(ParameterType::from_schema_type(Some("boolean")), ParameterType::Boolean);
        assert_eq!(ParameterType::from_schema_type(Some("array")), ParameterType::Array);
        assert_eq!(ParameterType::from_schema_type(Some("object")), ParameterType::Object);
        assert_eq!(ParameterType::from_schema_type(Some("null")), ParameterType::String);
        assert_eq!(ParameterType::from_schema_type(None), ParameterType::String);
    }

    #[test]
    fn test_outcome_into_result() {
        let ok = ToolCallOutcome::Success(serde_json::json!({"text": "hi"}));
        assert!(ok.is_success());
        assert_eq!(ok.into_result().unwrap()["text"], "hi");

        let remote = ToolCallOutcome::RemoteError(RemoteToolError {
            code: 7,
            message: "bad".to_string(),
            data: None,
        });
        let err = remote.into_result().unwrap_err();
        assert_eq!(err.to_string(), "[7] bad");
    }

    #[test]
    fn test_parameter_type_wire_format() {
        let param = ToolParameter {
            name: "x".to_string(),
            param_type: ParameterType::Number,
            description: String::new(),
            required: true,
        };
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["type"], "NUMBER");
    }
}
