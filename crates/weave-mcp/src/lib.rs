//! Stdio tool-server client.
//!
//! Launches external tool servers as child processes, talks JSON-RPC 2.0 to
//! them over stdin/stdout, discovers their tools and invokes them.
//!
//! ```no_run
//! # async fn demo() -> Result<(), weave_core::McpError> {
//! use weave_mcp::{InlineSource, McpService, McpSettings, YamlFileSource};
//!
//! let primary = InlineSource::from_yaml_str("agent.yaml", "mcp_servers: {}")?;
//! let secondary = YamlFileSource::default_location()?;
//! let service = McpService::from_sources(&[&primary, &secondary], McpSettings::from_env()?).await?;
//!
//! service
//!     .scoped(|svc| async move {
//!         for server in svc.list_servers() {
//!             let tools = svc.get_tools(&server.name).await?;
//!             println!("{}: {} tools", server.name, tools.len());
//!         }
//!         Ok(())
//!     })
//!     .await
//! # }
//! ```
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod catalog;
pub mod manager;
pub(crate) mod process;
pub mod protocol;
pub mod registry;
pub mod service;
pub(crate) mod session;
pub mod settings;
pub mod source;

// Re-export domain types from core for convenience
pub use weave_core::{
    McpError, McpEvent, McpEventEmitter, ParameterType, RemoteToolError, ServerDescriptor,
    ServerState, ServerStatus, ToolCallOutcome, ToolDefinition, ToolParameter,
};

// Re-export this crate's public types
pub use manager::{McpManager, RunningServer};
pub use registry::{Registration, ServerRegistry};
pub use service::McpService;
pub use settings::{EnvProvider, McpSettings, SystemEnv};
pub use source::{
    DescriptorSource, InlineSource, McpServersDocument, ServerEntries, YamlFileSource,
};
