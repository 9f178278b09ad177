//! Core domain types and ports for the weave tool-server client.
//!
//! This crate has no process or transport code. It defines what a tool
//! server is (`ServerDescriptor`), what it exposes (`ToolDefinition`), how
//! calls and failures are reported (`ToolCallOutcome`, `McpError`), and the
//! lifecycle event port hosts can plug into (`McpEventEmitter`).
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    EXTERNAL_CATEGORY, ParameterType, RemoteToolError, ServerConfigEntry, ServerDescriptor,
    ServerState, ServerStatus, ToolCallOutcome, ToolDefinition, ToolParameter,
};
pub use events::McpEvent;
pub use paths::{PathError, env_file_candidates, find_env_file, mcp_config_path, weave_home};
pub use ports::{
    McpError, McpErrorCategory, McpErrorInfo, McpEventEmitter, NoopEmitter, StartupFailure,
};
