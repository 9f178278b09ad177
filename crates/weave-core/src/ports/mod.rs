//! Port definitions (trait abstractions) and shared error types.
//!
//! Ports define the interfaces the client expects from its host. They contain
//! no implementation details and use only domain types.

pub mod event_emitter;
pub mod mcp_error;

pub use event_emitter::{McpEventEmitter, NoopEmitter};
pub use mcp_error::{McpError, McpErrorCategory, McpErrorInfo, StartupFailure};
