//! Tool server domain types.
//!
//! # Design
//!
//! - `ServerDescriptor` - An immutable, named server launch configuration
//! - `ServerConfigEntry` - The configuration-file shape of a descriptor (name is the key)
//! - `ServerState` - Lifecycle state (registered, starting, running, stopping, crashed)
//! - `ServerStatus` - Diagnostics snapshot of one server
//! - `ToolDefinition` / `ToolParameter` / `ParameterType` - Discovered tools
//! - `ToolCallOutcome` / `RemoteToolError` - Result of a tool invocation

mod server;
mod tool;

pub use server::{ServerConfigEntry, ServerDescriptor, ServerState, ServerStatus};
pub use tool::{
    EXTERNAL_CATEGORY, ParameterType, RemoteToolError, ToolCallOutcome, ToolDefinition,
    ToolParameter,
};
