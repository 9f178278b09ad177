//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where the CLI wires things together:
//! - `.env` loading (never overriding variables already set)
//! - the primary configuration object (`--config`, JSON or YAML)
//! - the secondary server file (`--servers-file` or `~/.weave/mcp_config.yaml`)
//! - runtime settings from `WEAVE_MCP_*` variables
//!
//! Command handlers receive the composed `CliContext`.

use std::path::{Path, PathBuf};

use weave_mcp::{DescriptorSource, InlineSource, McpService, McpSettings, YamlFileSource};

use crate::error::CliError;
use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Primary configuration object.
    pub config_file: Option<PathBuf>,
    /// Secondary server file; `None` means the default location.
    pub servers_file: Option<PathBuf>,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            config_file: cli.config.clone(),
            servers_file: cli.servers_file.clone(),
        }
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// The tool server service. Owns every process a command starts.
    pub service: McpService,
}

/// Load host environment overrides.
///
/// An explicit file must exist. Without one, `.agent/.env` then `.env` in
/// the working directory are tried and the first found is used. Variables
/// already present in the environment are kept.
pub fn load_env(explicit: Option<&Path>) -> Result<Option<PathBuf>, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match weave_core::find_env_file() {
            Ok(Some(path)) => path,
            Ok(None) => return Ok(None),
            Err(e) => return Err(CliError::Io(e.to_string())),
        },
    };

    dotenvy::from_path(&path)
        .map_err(|e| CliError::Config(format!("failed to load {}: {e}", path.display())))?;
    Ok(Some(path))
}

/// Read the primary configuration object. `.json` files are parsed as JSON,
/// everything else as YAML.
pub async fn load_primary(path: &Path) -> Result<InlineSource, CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
    let label = path.display().to_string();

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let source = if is_json {
        InlineSource::from_json_str(label, &text)?
    } else {
        InlineSource::from_yaml_str(label, &text)?
    };
    Ok(source)
}

/// Compose the CLI context.
pub async fn bootstrap(config: &CliConfig) -> Result<CliContext, CliError> {
    let primary = match &config.config_file {
        Some(path) => Some(load_primary(path).await?),
        None => None,
    };
    let secondary = match &config.servers_file {
        Some(path) => YamlFileSource::new(path),
        None => YamlFileSource::default_location()?,
    };

    let mut sources: Vec<&dyn DescriptorSource> = Vec::with_capacity(2);
    if let Some(primary) = &primary {
        sources.push(primary);
    }
    sources.push(&secondary);

    let settings = McpSettings::from_env()?;
    tracing::debug!(
        primary = ?config.config_file,
        secondary = %secondary.path().display(),
        init_timeout_ms = settings.init_timeout.as_millis(),
        "Bootstrapping tool server service"
    );

    let service = McpService::from_sources(&sources, settings).await?;
    Ok(CliContext { service })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_primary_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("agent.json");
        std::fs::write(&json_path, r#"{"mcp_servers": {"files": {"command": "npx"}}}"#).unwrap();
        let source = load_primary(&json_path).await.unwrap();
        assert_eq!(source.len(), 1);

        let yaml_path = dir.path().join("agent.yaml");
        std::fs::write(&yaml_path, "name: demo\nmcp_servers:\n  a: {command: x}\n  b: {command: y}\n").unwrap();
        let source = load_primary(&yaml_path).await.unwrap();
        assert_eq!(source.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_primary_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_primary(&dir.path().join("absent.yaml")).await.err().unwrap();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_merges_sources() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("agent.yaml");
        std::fs::write(&primary, "mcp_servers:\n  shared: {command: primary-cmd}\n").unwrap();
        let secondary = dir.path().join("servers.yaml");
        std::fs::write(
            &secondary,
            "mcp_servers:\n  shared: {command: secondary-cmd}\n  extra: {command: extra-cmd}\n",
        )
        .unwrap();

        let config = CliConfig {
            config_file: Some(primary),
            servers_file: Some(secondary),
        };
        let ctx = bootstrap(&config).await.unwrap();
        let servers = ctx.service.list_servers();
        let commands: Vec<_> = servers
            .iter()
            .map(|d| (d.name.as_str(), d.command.as_str()))
            .collect();
        assert_eq!(commands, [("extra", "extra-cmd"), ("shared", "primary-cmd")]);
    }

    #[test]
    fn test_explicit_env_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_env(Some(&dir.path().join("missing.env"))).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
