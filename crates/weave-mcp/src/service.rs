//! High-level tool server service.
//!
//! `McpService` is the surface hosts use: list servers, discover tools and
//! call them. Servers start lazily on first use. The service owns every
//! process it starts; call [`McpService::shutdown`] (or run host code inside
//! [`McpService::scoped`]) to stop them.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt as _;

use serde_json::{Map, Value, json};
use weave_core::{
    McpError, McpEventEmitter, RemoteToolError, ServerDescriptor, ServerState, ServerStatus,
    ToolCallOutcome, ToolDefinition,
};

use crate::catalog::parse_tools;
use crate::manager::{McpManager, RunningServer};
use crate::protocol::{METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, Reply, tool_call_params};
use crate::registry::ServerRegistry;
use crate::settings::McpSettings;
use crate::source::DescriptorSource;

/// Tool server service: lazy start, discovery and invocation.
pub struct McpService {
    manager: McpManager,
}

impl McpService {
    pub fn new(registry: ServerRegistry, settings: McpSettings) -> Self {
        Self {
            manager: McpManager::new(registry, settings),
        }
    }

    /// Build from configuration sources, highest precedence first.
    pub async fn from_sources(
        sources: &[&dyn DescriptorSource],
        settings: McpSettings,
    ) -> Result<Self, McpError> {
        let registry = ServerRegistry::load(sources).await?;
        tracing::debug!(servers = registry.len(), "Tool server registry loaded");
        Ok(Self::new(registry, settings))
    }

    /// Publish lifecycle events to `emitter`.
    #[must_use]
    pub fn with_emitter(self, emitter: Arc<dyn McpEventEmitter>) -> Self {
        Self {
            manager: self.manager.with_emitter(emitter),
        }
    }

    pub const fn manager(&self) -> &McpManager {
        &self.manager
    }

    /// All configured servers, name-ordered.
    pub fn list_servers(&self) -> Vec<ServerDescriptor> {
        self.manager.registry().list()
    }

    pub async fn start(&self, server: &str) -> Result<(), McpError> {
        self.manager.start(server).await.map(|_| ())
    }

    pub async fn stop(&self, server: &str) -> Result<(), McpError> {
        self.manager.stop(server).await
    }

    pub fn state(&self, server: &str) -> Result<ServerState, McpError> {
        self.manager.state(server)
    }

    pub fn status(&self, server: &str) -> Result<ServerStatus, McpError> {
        self.manager.status(server)
    }

    /// Tools advertised by `server`, starting it if needed.
    ///
    /// Discovery runs once per process instance; a restarted server is asked
    /// again.
    pub async fn get_tools(&self, server: &str) -> Result<Vec<ToolDefinition>, McpError> {
        let running = self.manager.start(server).await?;
        let tools = running
            .tool_cache()
            .get_or_try_init(|| self.discover(&running))
            .await?;
        Ok(tools.clone())
    }

    async fn discover(&self, running: &Arc<RunningServer>) -> Result<Vec<ToolDefinition>, McpError> {
        let reply = self
            .exchange(running, METHOD_TOOLS_LIST, Some(json!({})))
            .await?;
        let tools = match reply {
            Reply::Result(result) => parse_tools(running.name(), &result)?,
            Reply::Error(err) => {
                return Err(McpError::protocol(
                    running.name(),
                    format!("tools/list failed: [{}] {}", err.code, err.message),
                ));
            }
        };
        tracing::info!(server = %running.name(), tool_count = tools.len(), "Discovered tools");
        Ok(tools)
    }

    /// Invoke `tool` on `server`, starting the server if needed.
    ///
    /// An `error` reply from the server is returned as
    /// [`ToolCallOutcome::RemoteError`]; everything else that goes wrong is an
    /// `Err`.
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallOutcome, McpError> {
        let running = self.manager.start(server).await?;
        tracing::debug!(server = %server, tool = %tool, "Calling tool");

        let reply = self
            .exchange(
                &running,
                METHOD_TOOLS_CALL,
                Some(tool_call_params(tool, arguments)),
            )
            .await?;

        Ok(match reply {
            Reply::Result(value) => ToolCallOutcome::Success(value),
            Reply::Error(err) => {
                tracing::debug!(server = %server, tool = %tool, code = err.code, "Tool returned an error");
                ToolCallOutcome::RemoteError(RemoteToolError {
                    code: err.code,
                    message: err.message,
                    data: err.data,
                })
            }
        })
    }

    /// One request with the configured timeout, feeding failures to crash
    /// detection.
    async fn exchange(
        &self,
        running: &Arc<RunningServer>,
        method: &str,
        params: Option<Value>,
    ) -> Result<Reply, McpError> {
        let timeout = self.manager.settings().request_timeout;
        match running.session().request(method, params, timeout).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                self.manager.observe_failure(running, &err).await;
                Err(err)
            }
        }
    }

    /// Stop every running server.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }

    /// Run `f` and then shut every server down, whatever `f` returned.
    ///
    /// A panic inside `f` is caught, the servers are stopped, and the panic
    /// resumes. If the returned future is dropped before it completes no
    /// graceful shutdown happens; the children are then killed when the
    /// service itself is dropped.
    pub async fn scoped<'a, F, Fut, T>(&'a self, f: F) -> T
    where
        F: FnOnce(&'a Self) -> Fut,
        Fut: Future<Output = T> + 'a,
    {
        let output = AssertUnwindSafe(async move { f(self).await })
            .catch_unwind()
            .await;
        self.shutdown().await;
        match output {
            Ok(output) => output,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
