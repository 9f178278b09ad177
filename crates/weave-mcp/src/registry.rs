//! Server registry: immutable descriptors keyed by name.
//!
//! Precedence is first-loaded-wins. A name offered again by a *different*
//! source is ignored; a name offered twice by the *same* source cannot be
//! reconciled and is a configuration error.

use std::collections::BTreeMap;

use weave_core::{McpError, ServerDescriptor};

use crate::source::DescriptorSource;

/// Result of offering a descriptor to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The descriptor is now the registered one for its name.
    Inserted,
    /// An earlier source already registered this name; the offer was dropped.
    Shadowed,
}

#[derive(Debug, Clone)]
struct Entry {
    descriptor: ServerDescriptor,
    source: String,
}

/// Holds every configured server. Has no effect on running processes.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load sources in precedence order (highest first).
    pub async fn load(sources: &[&dyn DescriptorSource]) -> Result<Self, McpError> {
        let mut registry = Self::new();
        for source in sources {
            registry.load_source(*source).await?;
        }
        Ok(registry)
    }

    /// Load one source on top of what is already registered.
    pub async fn load_source(&mut self, source: &dyn DescriptorSource) -> Result<usize, McpError> {
        let descriptors = source.load().await?;
        let mut inserted = 0;
        for descriptor in descriptors {
            if self.register_from(source.label(), descriptor)? == Registration::Inserted {
                inserted += 1;
            }
        }
        tracing::debug!(source = %source.label(), inserted, "Loaded tool server descriptors");
        Ok(inserted)
    }

    /// Register a descriptor supplied directly by the host.
    pub fn register(&mut self, descriptor: ServerDescriptor) -> Result<Registration, McpError> {
        self.register_from("<host>", descriptor)
    }

    /// Register a descriptor on behalf of a named source.
    pub fn register_from(
        &mut self,
        source: &str,
        descriptor: ServerDescriptor,
    ) -> Result<Registration, McpError> {
        descriptor
            .validate()
            .map_err(|reason| McpError::config(&descriptor.name, reason))?;

        if let Some(existing) = self.entries.get(&descriptor.name) {
            if existing.source == source {
                return Err(McpError::config(
                    &descriptor.name,
                    format!("defined more than once in {source}"),
                ));
            }
            tracing::debug!(
                server = %descriptor.name,
                kept = %existing.source,
                ignored = %source,
                "Tool server already registered by an earlier source"
            );
            return Ok(Registration::Shadowed);
        }

        self.entries.insert(
            descriptor.name.clone(),
            Entry {
                descriptor,
                source: source.to_string(),
            },
        );
        Ok(Registration::Inserted)
    }

    /// Look up a descriptor by name.
    pub fn get(&self, name: &str) -> Result<&ServerDescriptor, McpError> {
        self.entries
            .get(name)
            .map(|entry| &entry.descriptor)
            .ok_or_else(|| McpError::NotFound(name.to_string()))
    }

    /// Which source a registered name came from.
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|entry| entry.source.as_str())
    }

    /// Name-ordered snapshot of all descriptors.
    pub fn list(&self) -> Vec<ServerDescriptor> {
        self.entries
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InlineSource;
    use weave_core::ServerConfigEntry;

    fn entry(command: &str) -> ServerConfigEntry {
        ServerConfigEntry {
            command: command.to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            enabled: true,
            description: String::new(),
        }
    }

    #[test]
    fn test_list_is_name_ordered() {
        let mut registry = ServerRegistry::new();
        registry.register(ServerDescriptor::new("zeta", "z")).unwrap();
        registry.register(ServerDescriptor::new("alpha", "a")).unwrap();
        registry.register(ServerDescriptor::new("mid", "m")).unwrap();

        let names: Vec<_> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let registry = ServerRegistry::new();
        let err = registry.get("ghost").unwrap_err();
        assert!(matches!(err, McpError::NotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_first_loaded_source_wins() {
        let primary = InlineSource::new("primary", vec![("files".to_string(), entry("first"))]);
        let secondary = InlineSource::new(
            "secondary",
            vec![
                ("files".to_string(), entry("second")),
                ("search".to_string(), entry("uvx")),
            ],
        );

        let registry = ServerRegistry::load(&[&primary, &secondary]).await.unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("files").unwrap().command, "first");
        assert_eq!(registry.source_of("files"), Some("primary"));
        assert_eq!(registry.source_of("search"), Some("secondary"));
    }

    #[tokio::test]
    async fn test_duplicate_within_one_source_is_config_error() {
        let source = InlineSource::new(
            "primary",
            vec![
                ("files".to_string(), entry("one")),
                ("files".to_string(), entry("two")),
            ],
        );

        let err = ServerRegistry::load(&[&source]).await.unwrap_err();
        assert!(matches!(err, McpError::Config { ref server, .. } if server == "files"));
    }

    #[test]
    fn test_register_shadowed_by_earlier_source() {
        let mut registry = ServerRegistry::new();
        registry
            .register_from("primary", ServerDescriptor::new("files", "a"))
            .unwrap();
        let outcome = registry
            .register_from("secondary", ServerDescriptor::new("files", "b"))
            .unwrap();
        assert_eq!(outcome, Registration::Shadowed);
        assert_eq!(registry.get("files").unwrap().command, "a");
    }

    #[test]
    fn test_register_rejects_invalid_descriptor() {
        let mut registry = ServerRegistry::new();
        let err = registry
            .register(ServerDescriptor::new("files", ""))
            .unwrap_err();
        assert!(matches!(err, McpError::Config { .. }));
        assert!(registry.is_empty());
    }
}
