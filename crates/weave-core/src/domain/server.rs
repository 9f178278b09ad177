//! Tool server domain types.
//!
//! These types describe a tool server as configured by the host and its
//! runtime state, independent of any process or transport concerns.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime state of a tool server.
///
/// `Registered` is both the initial state and the state every stop or failed
/// start returns to, so a server can be started again from it indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    /// Known to the registry, no process.
    #[default]
    Registered,
    /// Process spawned, handshake in progress.
    Starting,
    /// Handshake completed, session accepting requests.
    Running,
    /// Termination in progress.
    Stopping,
    /// Process exited on its own while running.
    Crashed,
}

impl ServerState {
    /// Whether a process handle exists in this state.
    pub const fn has_process(self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registered => "registered",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Crashed => "crashed",
        };
        f.write_str(label)
    }
}

/// Configuration entry for one server, as it appears under `mcp_servers`.
///
/// The name is the map key and is not part of the entry itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfigEntry {
    /// Executable to launch (e.g. `npx`, `python3`, or an absolute path).
    #[serde(default)]
    pub command: String,

    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overlay applied on top of the host environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Disabled servers stay listed but refuse to start.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

const fn default_enabled() -> bool {
    true
}

impl ServerConfigEntry {
    /// Attach a name, producing a descriptor.
    pub fn into_descriptor(self, name: impl Into<String>) -> ServerDescriptor {
        ServerDescriptor {
            name: name.into(),
            command: self.command,
            args: self.args,
            env: self.env,
            enabled: self.enabled,
            description: self.description,
        }
    }
}

/// An immutable, named tool server description.
///
/// Descriptors are owned by the registry; nothing mutates them after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Unique registry key.
    pub name: String,

    /// Executable to launch.
    pub command: String,

    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overlay (merged over the host environment at spawn).
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Whether the server may be started.
    pub enabled: bool,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl ServerDescriptor {
    /// Create an enabled descriptor with no arguments or environment.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            enabled: true,
            description: String::new(),
        }
    }

    /// Set the argument list.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add one environment overlay entry.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validate the launch configuration.
    ///
    /// The command must be non-empty and name an executable only; flags and
    /// arguments belong in `args`.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("server name cannot be empty".to_string());
        }

        if self.command.trim().is_empty() {
            return Err("command cannot be empty".to_string());
        }

        if self.command.contains(char::is_whitespace) {
            return Err(format!(
                "command must be an executable name/path only (got '{}'); \
                 put flags and arguments in 'args'",
                self.command
            ));
        }

        Ok(())
    }
}

/// Diagnostics snapshot of one server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    /// The configured descriptor.
    pub descriptor: ServerDescriptor,
    /// Current lifecycle state.
    pub state: ServerState,
    /// OS process id while a process exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// When the current process completed its handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// The peer's `initialize` result, kept for diagnostics only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<serde_json::Value>,
    /// Number of tools discovered by the current process, if discovery ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_count: Option<usize>,
}

impl ServerStatus {
    /// Snapshot for a server with no process.
    pub const fn idle(descriptor: ServerDescriptor, state: ServerState) -> Self {
        Self {
            descriptor,
            state,
            pid: None,
            started_at: None,
            server_info: None,
            tool_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_entry_defaults() {
        let entry: ServerConfigEntry = serde_json::from_str(r#"{"command": "npx"}"#).unwrap();
        assert!(entry.enabled);
        assert!(entry.args.is_empty());
        assert!(entry.env.is_empty());
        assert_eq!(entry.description, "");

        let descriptor = entry.into_descriptor("files");
        assert_eq!(descriptor.name, "files");
        assert_eq!(descriptor.command, "npx");
    }

    #[test]
    fn test_validate_rejects_command_with_flags() {
        let descriptor = ServerDescriptor::new("files", "npx -y server-files");
        let err = descriptor.validate().unwrap_err();
        assert!(err.contains("args"));
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let descriptor = ServerDescriptor::new("files", "  ");
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ServerState::Crashed).unwrap();
        assert_eq!(json, "\"crashed\"");
        assert_eq!(ServerState::default(), ServerState::Registered);
        assert!(ServerState::Starting.has_process());
        assert!(!ServerState::Crashed.has_process());
    }
}
