//! CLI-specific error types and mappings.
//!
//! Maps tool server errors onto exit codes and user-facing messages.

use thiserror::Error;
use weave_core::{McpError, McpErrorCategory, RemoteToolError};

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing error, or a server name that does not exist.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Process lifecycle or transport error.
    #[error("Process error: {0}")]
    Process(String),

    /// Malformed peer output or an unanswered request.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The tool ran and reported an error.
    #[error("Tool error {0}")]
    RemoteTool(RemoteToolError),

    /// `check` found servers that could not be used.
    #[error("{0} tool server(s) failed the check")]
    Unhealthy(usize),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error (tool reported failure, unhealthy servers)
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::RemoteTool(_) | Self::Unhealthy(_) => 1,
            Self::Arguments(_) => 2,
            Self::Process(_) => 71, // EX_OSERR
            Self::Io(_) => 74,      // EX_IOERR
            Self::Protocol(_) => 76, // EX_PROTOCOL
            Self::Config(_) => 78,  // EX_CONFIG
        }
    }
}

impl From<McpError> for CliError {
    fn from(err: McpError) -> Self {
        let message = err.to_string();
        match (&err, err.category()) {
            (McpError::NotFound(_), _) => Self::Arguments(message),
            (_, McpErrorCategory::Configuration) => Self::Config(message),
            (_, McpErrorCategory::Process) => Self::Process(message),
            (_, McpErrorCategory::Protocol) => Self::Protocol(message),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Exit code for any error that reached `main`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}
