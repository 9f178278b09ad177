//! Runtime settings for the tool-server client.
//!
//! Defaults suit servers launched through package runners (`npx`, `uvx`),
//! which can take many seconds before answering `initialize`. Every value can
//! be overridden from the environment.

use std::ffi::OsString;
use std::time::Duration;

use weave_core::McpError;

/// Protocol version sent in the `initialize` request.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name sent in the `initialize` request.
pub const DEFAULT_CLIENT_NAME: &str = "weave";

pub const ENV_INIT_TIMEOUT_MS: &str = "WEAVE_MCP_INIT_TIMEOUT_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "WEAVE_MCP_REQUEST_TIMEOUT_MS";
pub const ENV_SHUTDOWN_GRACE_MS: &str = "WEAVE_MCP_SHUTDOWN_GRACE_MS";
pub const ENV_MAX_STRAY_LINES: &str = "WEAVE_MCP_MAX_STRAY_LINES";
pub const ENV_PROTOCOL_VERSION: &str = "WEAVE_MCP_PROTOCOL_VERSION";

/// Name used in configuration errors raised by settings parsing.
const SETTINGS_SCOPE: &str = "<settings>";

/// Trait for accessing environment variables (injectable for testing).
pub trait EnvProvider {
    /// Get an environment variable.
    fn get(&self, key: &str) -> Option<OsString>;
}

/// Production environment provider that reads from the actual process environment.
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

/// Timeouts and protocol identity used by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpSettings {
    /// Deadline for the `initialize` exchange.
    pub init_timeout: Duration,
    /// Per-call deadline for `tools/list` and `tools/call`.
    pub request_timeout: Duration,
    /// How long `stop` waits after the termination signal before killing.
    pub shutdown_grace: Duration,
    /// Consecutive unmatched stdout lines tolerated while requests are pending.
    pub max_stray_lines: usize,
    pub protocol_version: String,
    pub client_name: String,
    pub client_version: String,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
            max_stray_lines: 1000,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl McpSettings {
    /// Defaults overridden by `WEAVE_MCP_*` variables from the process environment.
    pub fn from_env() -> Result<Self, McpError> {
        Self::from_provider(&SystemEnv)
    }

    /// Defaults overridden by `WEAVE_MCP_*` variables from `env`.
    pub fn from_provider(env: &dyn EnvProvider) -> Result<Self, McpError> {
        let mut settings = Self::default();

        if let Some(ms) = read_u64(env, ENV_INIT_TIMEOUT_MS)? {
            settings.init_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_u64(env, ENV_REQUEST_TIMEOUT_MS)? {
            settings.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_u64(env, ENV_SHUTDOWN_GRACE_MS)? {
            settings.shutdown_grace = Duration::from_millis(ms);
        }
        if let Some(lines) = read_u64(env, ENV_MAX_STRAY_LINES)? {
            settings.max_stray_lines = usize::try_from(lines).unwrap_or(usize::MAX);
        }
        if let Some(version) = read_string(env, ENV_PROTOCOL_VERSION)? {
            settings.protocol_version = version;
        }

        Ok(settings)
    }

    #[must_use]
    pub const fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    #[must_use]
    pub const fn with_max_stray_lines(mut self, lines: usize) -> Self {
        self.max_stray_lines = lines;
        self
    }
}

fn read_string(env: &dyn EnvProvider, key: &str) -> Result<Option<String>, McpError> {
    let Some(raw) = env.get(key) else {
        return Ok(None);
    };
    let value = raw
        .into_string()
        .map_err(|_| McpError::config(SETTINGS_SCOPE, format!("{key} is not valid UTF-8")))?;
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(value.to_string()))
}

fn read_u64(env: &dyn EnvProvider, key: &str) -> Result<Option<u64>, McpError> {
    let Some(value) = read_string(env, key)? else {
        return Ok(None);
    };
    match value.parse::<u64>() {
        Ok(0) => Err(McpError::config(
            SETTINGS_SCOPE,
            format!("{key} must be greater than zero"),
        )),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(McpError::config(
            SETTINGS_SCOPE,
            format!("{key}='{value}' is not a number: {e}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockEnv {
        vars: HashMap<String, OsString>,
    }

    impl MockEnv {
        fn with_var(mut self, key: &str, value: &str) -> Self {
            self.vars.insert(key.to_string(), value.into());
            self
        }
    }

    impl EnvProvider for MockEnv {
        fn get(&self, key: &str) -> Option<OsString> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_defaults_without_overrides() {
        let settings = McpSettings::from_provider(&MockEnv::default()).unwrap();
        assert_eq!(settings, McpSettings::default());
        assert_eq!(settings.protocol_version, DEFAULT_PROTOCOL_VERSION);
        assert_eq!(settings.client_name, "weave");
    }

    #[test]
    fn test_overrides_from_env() {
        let env = MockEnv::default()
            .with_var(ENV_INIT_TIMEOUT_MS, "1500")
            .with_var(ENV_REQUEST_TIMEOUT_MS, " 2000 ")
            .with_var(ENV_MAX_STRAY_LINES, "10")
            .with_var(ENV_PROTOCOL_VERSION, "2025-03-26");
        let settings = McpSettings::from_provider(&env).unwrap();
        assert_eq!(settings.init_timeout, Duration::from_millis(1500));
        assert_eq!(settings.request_timeout, Duration::from_millis(2000));
        assert_eq!(settings.shutdown_grace, Duration::from_secs(5));
        assert_eq!(settings.max_stray_lines, 10);
        assert_eq!(settings.protocol_version, "2025-03-26");
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let env = MockEnv::default().with_var(ENV_INIT_TIMEOUT_MS, "soon");
        let err = McpSettings::from_provider(&env).unwrap_err();
        assert!(matches!(err, McpError::Config { .. }));
        assert!(err.to_string().contains(ENV_INIT_TIMEOUT_MS));

        let env = MockEnv::default().with_var(ENV_SHUTDOWN_GRACE_MS, "0");
        assert!(McpSettings::from_provider(&env).is_err());
    }
}
