//! Configuration sources for server descriptors.
//!
//! Two kinds of source feed the registry:
//! - `InlineSource` - the host's primary configuration object (in memory,
//!   or JSON/YAML text), whose `mcp_servers` key holds the server map
//! - `YamlFileSource` - the secondary file, `~/.weave/mcp_config.yaml` by default
//!
//! Both produce descriptors in a stable order; precedence between sources is
//! decided by the registry, not here.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use weave_core::{McpError, ServerConfigEntry, ServerDescriptor};

/// A configuration document carrying an `mcp_servers` map.
///
/// Unknown top-level keys are ignored, so a full host configuration object
/// can be handed over as-is.
#[derive(Debug, Default, Deserialize)]
pub struct McpServersDocument {
    #[serde(default)]
    pub mcp_servers: Option<ServerEntries>,
}

/// The `mcp_servers` map in document order.
///
/// A name that appears twice is kept twice, so the registry can reject it
/// instead of silently keeping the last one.
#[derive(Debug, Default, Clone)]
pub struct ServerEntries(pub Vec<(String, ServerConfigEntry)>);

impl<'de> Deserialize<'de> for ServerEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ServerEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of server names to server entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ServerEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, ServerConfigEntry>()? {
                    entries.push(entry);
                }
                Ok(ServerEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Port for anything that can produce server descriptors.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Human-readable origin, used in logs and configuration errors.
    fn label(&self) -> &str;

    /// Load and validate all descriptors from this source.
    async fn load(&self) -> Result<Vec<ServerDescriptor>, McpError>;
}

/// Descriptors supplied directly by the host.
#[derive(Debug, Clone)]
pub struct InlineSource {
    label: String,
    entries: Vec<(String, ServerConfigEntry)>,
}

impl InlineSource {
    /// Build from name/entry pairs. Order is kept, duplicates included.
    pub fn new(label: impl Into<String>, entries: Vec<(String, ServerConfigEntry)>) -> Self {
        Self {
            label: label.into(),
            entries,
        }
    }

    /// Build from a server map.
    pub fn from_map(label: impl Into<String>, servers: BTreeMap<String, ServerConfigEntry>) -> Self {
        Self::new(label, servers.into_iter().collect())
    }

    /// Build from an already-parsed configuration object.
    pub fn from_value(label: impl Into<String>, value: serde_json::Value) -> Result<Self, McpError> {
        let label = label.into();
        let document: McpServersDocument = serde_json::from_value(value)
            .map_err(|e| McpError::config(&label, format!("invalid configuration object: {e}")))?;
        Ok(Self::from_document(label, document))
    }

    /// Build from JSON text.
    pub fn from_json_str(label: impl Into<String>, text: &str) -> Result<Self, McpError> {
        let label = label.into();
        let document: McpServersDocument = serde_json::from_str(text)
            .map_err(|e| McpError::config(&label, format!("invalid JSON: {e}")))?;
        Ok(Self::from_document(label, document))
    }

    /// Build from YAML text. Empty text yields an empty source.
    pub fn from_yaml_str(label: impl Into<String>, text: &str) -> Result<Self, McpError> {
        let label = label.into();
        let document = parse_yaml_document(&label, text)?;
        Ok(Self::from_document(label, document))
    }

    fn from_document(label: String, document: McpServersDocument) -> Self {
        Self::new(label, document.mcp_servers.unwrap_or_default().0)
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DescriptorSource for InlineSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn load(&self) -> Result<Vec<ServerDescriptor>, McpError> {
        into_descriptors(self.entries.iter().cloned())
    }
}

/// The secondary, file-based source.
///
/// A missing file contributes nothing; an unreadable or unparsable file is a
/// configuration error.
#[derive(Debug, Clone)]
pub struct YamlFileSource {
    path: PathBuf,
    label: String,
}

impl YamlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }

    /// Source for the default `~/.weave/mcp_config.yaml`.
    pub fn default_location() -> Result<Self, McpError> {
        let path = weave_core::mcp_config_path()
            .map_err(|e| McpError::config("~/.weave/mcp_config.yaml", e.to_string()))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DescriptorSource for YamlFileSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn load(&self) -> Result<Vec<ServerDescriptor>, McpError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.label, "No server configuration file");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(McpError::config(
                    &self.label,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let document = parse_yaml_document(&self.label, &text)?;
        into_descriptors(document.mcp_servers.unwrap_or_default().0)
    }
}

fn parse_yaml_document(label: &str, text: &str) -> Result<McpServersDocument, McpError> {
    if text.trim().is_empty() {
        return Ok(McpServersDocument::default());
    }
    serde_yaml::from_str(text).map_err(|e| McpError::config(label, format!("invalid YAML: {e}")))
}

fn into_descriptors(
    entries: impl IntoIterator<Item = (String, ServerConfigEntry)>,
) -> Result<Vec<ServerDescriptor>, McpError> {
    entries
        .into_iter()
        .map(|(name, entry)| {
            let descriptor = entry.into_descriptor(name);
            descriptor
                .validate()
                .map_err(|reason| McpError::config(&descriptor.name, reason))?;
            Ok(descriptor)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r"
model: gpt-4
mcp_servers:
  files:
    command: npx
    args: ['-y', '@modelcontextprotocol/server-filesystem', '/tmp']
    description: Local files
  search:
    command: uvx
    env:
      API_KEY: secret
    enabled: false
";

    #[tokio::test]
    async fn test_yaml_text_source() {
        let source = InlineSource::from_yaml_str("agent.yaml", SAMPLE_YAML).unwrap();
        let descriptors = source.load().await.unwrap();
        assert_eq!(descriptors.len(), 2);

        let files = &descriptors[0];
        assert_eq!(files.name, "files");
        assert_eq!(files.args.len(), 3);
        assert!(files.enabled);
        assert_eq!(files.description, "Local files");

        let search = &descriptors[1];
        assert!(!search.enabled);
        assert_eq!(search.env.get("API_KEY").map(String::as_str), Some("secret"));
    }

    #[tokio::test]
    async fn test_json_value_without_servers_is_empty() {
        let source =
            InlineSource::from_value("agent", serde_json::json!({"model": "gpt-4"})).unwrap();
        assert!(source.is_empty());
        assert!(source.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_entry_names_the_server() {
        let source = InlineSource::from_json_str(
            "agent.json",
            r#"{"mcp_servers": {"broken": {"command": "npx -y thing"}}}"#,
        )
        .unwrap();
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, McpError::Config { ref server, .. } if server == "broken"));
    }

    #[tokio::test]
    async fn test_duplicate_json_key_is_rejected() {
        let source = InlineSource::from_json_str(
            "agent.json",
            r#"{"mcp_servers": {"files": {"command": "npx"}, "files": {"command": "uvx"}}}"#,
        )
        .unwrap();
        assert_eq!(source.len(), 2);

        let err = crate::ServerRegistry::load(&[&source]).await.err().unwrap();
        assert!(matches!(err, McpError::Config { ref server, ref reason } if server == "files" && reason.contains("more than once")));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = InlineSource::from_json_str("agent.json", "{not json").unwrap_err();
        assert!(matches!(err, McpError::Config { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = YamlFileSource::new(dir.path().join("absent.yaml"));
        assert!(source.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp_config.yaml");
        std::fs::write(&path, "mcp_servers: [unclosed").unwrap();

        let err = YamlFileSource::new(&path).load().await.unwrap_err();
        assert!(matches!(err, McpError::Config { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp_config.yaml");
        std::fs::write(&path, "\n").unwrap();

        assert!(YamlFileSource::new(&path).load().await.unwrap().is_empty());
    }
}
