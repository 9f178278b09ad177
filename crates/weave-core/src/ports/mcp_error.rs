//! Tool server error types.
//!
//! This module defines the failure taxonomy shared by every layer of the
//! client. All variants are raised to the caller; a remote tool error is not
//! part of this enum because it is a legitimate peer answer
//! (see [`crate::ToolCallOutcome`]).

use std::time::Duration;

use thiserror::Error;

/// Why a server failed to reach the running state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupFailure {
    /// The process could not be spawned.
    #[error("spawn failed: {0}")]
    Spawn(String),

    /// No `initialize` response within the handshake deadline.
    #[error("timeout: no initialize response within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The peer answered `initialize` without a usable result.
    #[error("handshake rejected: {0}")]
    Rejected(String),

    /// The pipes broke or the process exited during the handshake.
    #[error("transport failure during handshake: {0}")]
    Transport(String),
}

/// Errors raised by tool server operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// Bad or missing descriptor, unresolved name collision, unreadable source.
    #[error("Invalid tool server configuration ({server}): {reason}")]
    Config { server: String, reason: String },

    /// Unknown server name.
    #[error("Unknown tool server: {0}")]
    NotFound(String),

    /// The descriptor is marked disabled.
    #[error("Tool server '{0}' is disabled")]
    Disabled(String),

    /// Spawn failure, handshake timeout or rejection.
    #[error("Failed to start tool server '{server}': {cause}")]
    Startup {
        server: String,
        cause: StartupFailure,
    },

    /// Broken pipe or unexpected process exit during a call.
    #[error("Transport error for tool server '{server}': {reason}")]
    Transport { server: String, reason: String },

    /// Malformed JSON or unrecoverable correlation failure.
    #[error("Protocol error for tool server '{server}': {reason}")]
    Protocol { server: String, reason: String },

    /// No matching response within the per-call deadline.
    #[error("Tool server '{server}' did not answer '{method}' within {timeout_ms}ms")]
    Timeout {
        server: String,
        method: String,
        timeout_ms: u64,
    },

    /// The server was stopped while the call was in flight.
    #[error("Call to tool server '{server}' was cancelled: server stopped")]
    Cancelled { server: String },
}

impl McpError {
    /// Build a configuration error annotated with the offending server name.
    pub fn config(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            server: server.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            server: server.into(),
            reason: reason.into(),
        }
    }

    pub fn protocol(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            server: server.into(),
            reason: reason.into(),
        }
    }

    pub fn startup(server: impl Into<String>, cause: StartupFailure) -> Self {
        Self::Startup {
            server: server.into(),
            cause,
        }
    }

    /// Name of the server this error concerns.
    pub fn server(&self) -> &str {
        match self {
            Self::NotFound(server) | Self::Disabled(server) => server,
            Self::Config { server, .. }
            | Self::Startup { server, .. }
            | Self::Transport { server, .. }
            | Self::Protocol { server, .. }
            | Self::Timeout { server, .. }
            | Self::Cancelled { server } => server,
        }
    }

    pub const fn category(&self) -> McpErrorCategory {
        match self {
            Self::Config { .. } | Self::NotFound(_) | Self::Disabled(_) => {
                McpErrorCategory::Configuration
            }
            Self::Startup { .. } | Self::Transport { .. } | Self::Cancelled { .. } => {
                McpErrorCategory::Process
            }
            Self::Protocol { .. } | Self::Timeout { .. } => McpErrorCategory::Protocol,
        }
    }
}

/// Categories of tool server errors for host-side handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpErrorCategory {
    /// Server process lifecycle error.
    Process,
    /// Protocol communication error.
    Protocol,
    /// Configuration error.
    Configuration,
}

/// User-safe error information for lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpErrorInfo {
    /// Name of the tool server.
    pub server_name: String,

    /// User-friendly error message.
    pub message: String,

    /// Error category for host handling.
    pub category: McpErrorCategory,
}

impl From<&McpError> for McpErrorInfo {
    fn from(error: &McpError) -> Self {
        Self {
            server_name: error.server().to_string(),
            message: error.to_string(),
            category: error.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_timeout_message() {
        let err = McpError::startup("files", StartupFailure::Timeout(Duration::from_millis(250)));
        let msg = err.to_string();
        assert!(msg.contains("files"));
        assert!(msg.contains("timeout"));
        assert!(msg.contains("250ms"));
        assert_eq!(err.category(), McpErrorCategory::Process);
    }

    #[test]
    fn test_error_info_from_error() {
        let err = McpError::Disabled("search".to_string());
        let info = McpErrorInfo::from(&err);
        assert_eq!(info.server_name, "search");
        assert_eq!(info.category, McpErrorCategory::Configuration);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["serverName"], "search");
        assert_eq!(json["category"], "configuration");
    }
}
