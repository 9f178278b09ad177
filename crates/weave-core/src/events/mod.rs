//! Tool server lifecycle events.
//!
//! Events are serialized with a `type` tag so hosts can forward them as-is:
//!
//! ```json
//! { "type": "server_started", "serverName": "files", "pid": 4242 }
//! ```

use serde::{Deserialize, Serialize};

use crate::ports::McpErrorInfo;

/// Lifecycle events emitted by the process manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpEvent {
    /// A server completed its handshake and is accepting calls.
    ServerStarted {
        #[serde(rename = "serverName")]
        server_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
    },

    /// A server was stopped by the host.
    ServerStopped {
        #[serde(rename = "serverName")]
        server_name: String,
        /// Whether the process had to be force-killed after the grace period.
        forced: bool,
    },

    /// A running server's process exited on its own.
    ServerCrashed {
        #[serde(rename = "serverName")]
        server_name: String,
        #[serde(rename = "exitCode", skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    /// A lifecycle operation failed.
    ServerError { error: McpErrorInfo },
}

impl McpEvent {
    pub fn server_started(server_name: impl Into<String>, pid: Option<u32>) -> Self {
        Self::ServerStarted {
            server_name: server_name.into(),
            pid,
        }
    }

    pub fn server_stopped(server_name: impl Into<String>, forced: bool) -> Self {
        Self::ServerStopped {
            server_name: server_name.into(),
            forced,
        }
    }

    pub fn server_crashed(server_name: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ServerCrashed {
            server_name: server_name.into(),
            exit_code,
        }
    }

    pub const fn server_error(error: McpErrorInfo) -> Self {
        Self::ServerError { error }
    }

    /// Name of the server the event concerns.
    pub fn server_name(&self) -> &str {
        match self {
            Self::ServerStarted { server_name, .. }
            | Self::ServerStopped { server_name, .. }
            | Self::ServerCrashed { server_name, .. } => server_name,
            Self::ServerError { error } => &error.server_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = McpEvent::server_started("files", Some(42));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "server_started");
        assert_eq!(json["serverName"], "files");
        assert_eq!(json["pid"], 42);
    }

    #[test]
    fn test_crashed_omits_missing_exit_code() {
        let event = McpEvent::server_crashed("files", None);
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("exitCode"));
        assert_eq!(event.server_name(), "files");
    }

    #[test]
    fn test_error_event_round_trips() {
        let err = crate::McpError::Disabled("search".to_string());
        let event = McpEvent::server_error(McpErrorInfo::from(&err));
        let json = serde_json::to_string(&event).unwrap();
        let back: McpEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.server_name(), "search");
    }
}
