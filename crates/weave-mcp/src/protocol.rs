//! JSON-RPC 2.0 wire types for the stdio transport.
//!
//! One JSON object per line in each direction. Only the subset needed by the
//! client is modelled; unknown fields are ignored on the way in.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::settings::McpSettings;

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Outgoing request. Notifications carry no id.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub const fn call(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method,
            params,
        }
    }

    pub const fn notification(method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params,
        }
    }

    /// Serialize as a single newline-terminated line.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Incoming message. Anything with a `method` is a peer request or
/// notification and is never treated as a response.
///
/// `result` and `error` are kept loose so that a response with a known id but
/// a malformed body still reaches its waiter as a protocol error.
#[derive(Debug, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    /// `Some(Value::Null)` for `"result": null`, `None` when absent.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcMessage {
    /// The numeric id this message answers, if it is a response at all.
    pub fn response_id(&self) -> Option<u64> {
        if self.method.is_some() {
            return None;
        }
        match self.id.as_ref()? {
            Value::Number(n) => n.as_u64(),
            // Some servers echo ids back as strings.
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Error member of a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// What a matched response resolves to.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Error(JsonRpcError),
}

impl TryFrom<JsonRpcMessage> for Reply {
    type Error = String;

    /// `error` wins over `result`. A response carrying neither, or an
    /// `error` member that is not a valid error object, is rejected.
    fn try_from(message: JsonRpcMessage) -> Result<Self, String> {
        match (message.error, message.result) {
            (Some(error), _) => serde_json::from_value(error)
                .map(Reply::Error)
                .map_err(|e| format!("malformed error member: {e}")),
            (None, Some(result)) => Ok(Reply::Result(result)),
            (None, None) => Err("response has neither result nor error".to_string()),
        }
    }
}

/// Params of the `initialize` request.
pub fn initialize_params(settings: &McpSettings) -> Value {
    json!({
        "protocolVersion": settings.protocol_version,
        "capabilities": {},
        "clientInfo": {
            "name": settings.client_name,
            "version": settings.client_version,
        }
    })
}

/// Params of a `tools/call` request.
pub fn tool_call_params(tool: &str, arguments: serde_json::Map<String, Value>) -> Value {
    json!({
        "name": tool,
        "arguments": Value::Object(arguments),
    })
}
