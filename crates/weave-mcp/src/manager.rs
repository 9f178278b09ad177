//! Tool server lifecycle management.
//!
//! Owns one slot per registered server. A slot tracks the lifecycle state and,
//! while a process exists, the `RunningServer` (process handle, session,
//! handshake result, tool cache). Transitions for one server are serialized
//! by the slot's lifecycle lock; reads of state never wait on it.
//!
//! ```text
//! registered -> starting -> running -> stopping -> registered
//!                  |            |
//!                  v            v
//!             registered     crashed -> (next start spawns fresh)
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use weave_core::{
    McpError, McpErrorInfo, McpEvent, McpEventEmitter, NoopEmitter, ServerDescriptor,
    ServerState, ServerStatus, StartupFailure, ToolDefinition,
};

use crate::process::ServerProcess;
use crate::registry::ServerRegistry;
use crate::session::Session;
use crate::settings::McpSettings;

/// How long crash detection waits for a process whose pipes broke to exit.
const CRASH_PROBE: Duration = Duration::from_millis(500);

/// A server process that completed its handshake.
pub struct RunningServer {
    descriptor: ServerDescriptor,
    process: Mutex<Option<ServerProcess>>,
    session: Session,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    server_info: Value,
    tools: OnceCell<Vec<ToolDefinition>>,
}

impl RunningServer {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub(crate) const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The peer's `initialize` result.
    pub const fn server_info(&self) -> &Value {
        &self.server_info
    }

    /// Tool catalog cached for this process instance.
    pub const fn tool_cache(&self) -> &OnceCell<Vec<ToolDefinition>> {
        &self.tools
    }

    async fn is_alive(&self) -> bool {
        if self.session.is_closed() {
            return false;
        }
        self.process
            .lock()
            .await
            .as_mut()
            .is_some_and(|process| process.try_exit().is_none())
    }
}

#[derive(Default)]
struct SlotState {
    state: ServerState,
    running: Option<Arc<RunningServer>>,
}

struct ServerSlot {
    descriptor: ServerDescriptor,
    lifecycle: Mutex<()>,
    current: StdMutex<SlotState>,
}

impl ServerSlot {
    fn new(descriptor: ServerDescriptor) -> Self {
        Self {
            descriptor,
            lifecycle: Mutex::new(()),
            current: StdMutex::new(SlotState::default()),
        }
    }

    fn current(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ServerState) {
        self.current().state = state;
    }

    fn snapshot(&self) -> (ServerState, Option<Arc<RunningServer>>) {
        let current = self.current();
        (current.state, current.running.clone())
    }
}

/// Manager for tool server processes.
pub struct McpManager {
    registry: ServerRegistry,
    settings: McpSettings,
    emitter: Arc<dyn McpEventEmitter>,
    slots: BTreeMap<String, ServerSlot>,
}

impl McpManager {
    pub fn new(registry: ServerRegistry, settings: McpSettings) -> Self {
        let slots = registry
            .list()
            .into_iter()
            .map(|descriptor| (descriptor.name.clone(), ServerSlot::new(descriptor)))
            .collect();
        Self {
            registry,
            settings,
            emitter: Arc::new(NoopEmitter::new()),
            slots,
        }
    }

    /// Replace the lifecycle event sink.
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn McpEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub const fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub const fn settings(&self) -> &McpSettings {
        &self.settings
    }

    fn slot(&self, name: &str) -> Result<&ServerSlot, McpError> {
        self.slots
            .get(name)
            .ok_or_else(|| McpError::NotFound(name.to_string()))
    }

    /// Current lifecycle state.
    pub fn state(&self, name: &str) -> Result<ServerState, McpError> {
        Ok(self.slot(name)?.current().state)
    }

    /// Diagnostics snapshot.
    pub fn status(&self, name: &str) -> Result<ServerStatus, McpError> {
        let slot = self.slot(name)?;
        let (state, running) = slot.snapshot();
        let mut status = ServerStatus::idle(slot.descriptor.clone(), state);
        if let Some(running) = running {
            status.pid = running.pid;
            status.started_at = Some(running.started_at);
            status.server_info = Some(running.server_info.clone());
            status.tool_count = running.tools.get().map(Vec::len);
        }
        Ok(status)
    }

    /// Names of servers currently in the running state.
    pub fn running(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.current().state == ServerState::Running)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Ensure the server is running and return it.
    ///
    /// Idempotent while the process is alive. A crashed or dead process is
    /// replaced by a fresh spawn.
    pub async fn start(&self, name: &str) -> Result<Arc<RunningServer>, McpError> {
        let slot = self.slot(name)?;
        if !slot.descriptor.enabled {
            return Err(McpError::Disabled(name.to_string()));
        }

        let _lifecycle = slot.lifecycle.lock().await;

        let (state, running) = slot.snapshot();
        if let Some(running) = running {
            if state == ServerState::Running && running.is_alive().await {
                return Ok(running);
            }
            self.record_crash(slot, &running).await;
        }

        slot.set_state(ServerState::Starting);
        tracing::info!(server = %name, command = %slot.descriptor.command, "Starting tool server");

        match self.launch(&slot.descriptor).await {
            Ok(running) => {
                let running = Arc::new(running);
                {
                    let mut current = slot.current();
                    current.state = ServerState::Running;
                    current.running = Some(Arc::clone(&running));
                }
                tracing::info!(server = %name, pid = ?running.pid, "Tool server running");
                self.emitter
                    .emit(McpEvent::server_started(name, running.pid));
                Ok(running)
            }
            Err(cause) => {
                slot.set_state(ServerState::Registered);
                let err = McpError::startup(name, cause);
                tracing::warn!(server = %name, error = %err, "Tool server failed to start");
                self.emitter
                    .emit(McpEvent::server_error(McpErrorInfo::from(&err)));
                Err(err)
            }
        }
    }

    /// Spawn and handshake. On any failure the process is terminated.
    async fn launch(&self, descriptor: &ServerDescriptor) -> Result<RunningServer, StartupFailure> {
        let (process, pipes) = ServerProcess::spawn(descriptor)?;
        let pid = process.pid();
        let session = Session::start(&descriptor.name, pipes, self.settings.max_stray_lines);

        let server_info = match session.initialize(&self.settings).await {
            Ok(info) => info,
            Err(cause) => {
                session.cancel();
                if let Err(e) = process.shutdown(self.settings.shutdown_grace).await {
                    tracing::warn!(server = %descriptor.name, error = %e, "Failed to reap tool server after failed handshake");
                }
                return Err(cause);
            }
        };

        Ok(RunningServer {
            descriptor: descriptor.clone(),
            process: Mutex::new(Some(process)),
            session,
            pid,
            started_at: Utc::now(),
            server_info,
            tools: OnceCell::new(),
        })
    }

    /// Stop the server's process. A server without a process is left as is.
    ///
    /// Sends the termination signal, waits for the grace period, kills if
    /// needed and reaps. The state ends `registered` regardless of how the
    /// process went away. In-flight calls fail with `Cancelled`.
    pub async fn stop(&self, name: &str) -> Result<(), McpError> {
        let slot = self.slot(name)?;
        let _lifecycle = slot.lifecycle.lock().await;

        let running = {
            let mut current = slot.current();
            let Some(running) = current.running.take() else {
                current.state = ServerState::Registered;
                return Ok(());
            };
            current.state = ServerState::Stopping;
            running
        };

        tracing::info!(server = %name, pid = ?running.pid, "Stopping tool server");
        running.session.cancel();

        let process = running.process.lock().await.take();
        let forced = match process {
            Some(process) => match process.shutdown(self.settings.shutdown_grace).await {
                Ok(outcome) => {
                    tracing::debug!(server = %name, status = ?outcome.status, forced = outcome.forced, "Tool server exited");
                    outcome.forced
                }
                Err(e) => {
                    tracing::warn!(server = %name, error = %e, "Error while terminating tool server");
                    true
                }
            },
            None => false,
        };

        slot.set_state(ServerState::Registered);
        self.emitter.emit(McpEvent::server_stopped(name, forced));
        Ok(())
    }

    /// Stop every server that has a process. Each is stopped once.
    pub async fn shutdown(&self) {
        for name in self.slots.keys() {
            if let Err(e) = self.stop(name).await {
                tracing::warn!(server = %name, error = %e, "Failed to stop tool server during shutdown");
            }
        }
    }

    /// Crash detection after a failed exchange.
    ///
    /// Only transport failures are considered. If the process has exited (or
    /// its output is closed) the server moves to `crashed` and the handle is
    /// dropped, so the next start spawns a new process.
    pub async fn observe_failure(&self, running: &Arc<RunningServer>, error: &McpError) {
        if !matches!(error, McpError::Transport { .. }) {
            return;
        }
        let Ok(slot) = self.slot(running.name()) else {
            return;
        };
        let _lifecycle = slot.lifecycle.lock().await;
        self.record_crash(slot, running).await;
    }

    /// Caller holds the slot's lifecycle lock.
    async fn record_crash(&self, slot: &ServerSlot, running: &Arc<RunningServer>) {
        let is_current = slot
            .current()
            .running
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, running));
        if !is_current {
            return;
        }

        let exit_status = {
            let mut process = running.process.lock().await;
            match process.as_mut() {
                Some(handle) => handle.wait_exit(CRASH_PROBE).await,
                None => None,
            }
        };
        if exit_status.is_none() && !running.session.is_closed() {
            return;
        }

        running.session.cancel();
        if exit_status.is_none() {
            // Output closed but the process lingers; it cannot be talked to.
            let process = running.process.lock().await.take();
            if let Some(process) = process {
                if let Err(e) = process.shutdown(self.settings.shutdown_grace).await {
                    tracing::warn!(server = %running.name(), error = %e, "Failed to terminate unresponsive tool server");
                }
            }
        }

        {
            let mut current = slot.current();
            current.state = ServerState::Crashed;
            current.running = None;
        }

        let exit_code = exit_status.and_then(|status| status.code());
        tracing::warn!(server = %running.name(), exit_code = ?exit_code, "Tool server crashed");
        self.emitter
            .emit(McpEvent::server_crashed(running.name(), exit_code));
    }
}

impl Drop for McpManager {
    fn drop(&mut self) {
        let live = self.slots.values().filter(|slot| slot.current().running.is_some()).count();
        if live > 0 {
            tracing::warn!(
                live,
                "McpManager dropped without shutdown; remaining tool servers will be killed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(descriptors: Vec<ServerDescriptor>) -> McpManager {
        let mut registry = ServerRegistry::new();
        for descriptor in descriptors {
            registry.register(descriptor).unwrap();
        }
        McpManager::new(
            registry,
            McpSettings::default().with_init_timeout(Duration::from_millis(300)),
        )
    }

    #[tokio::test]
    async fn test_unknown_server_is_not_found() {
        let manager = manager_with(vec![]);
        assert!(matches!(manager.start("ghost").await, Err(McpError::NotFound(_))));
        assert!(matches!(manager.stop("ghost").await, Err(McpError::NotFound(_))));
        assert!(matches!(manager.state("ghost"), Err(McpError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_disabled_server_never_spawns() {
        let manager = manager_with(vec![ServerDescriptor::new("off", "/nonexistent").with_enabled(false)]);
        assert!(matches!(manager.start("off").await, Err(McpError::Disabled(_))));
        assert_eq!(manager.state("off").unwrap(), ServerState::Registered);
    }

    #[tokio::test]
    async fn test_spawn_failure_returns_to_registered() {
        let manager = manager_with(vec![ServerDescriptor::new("missing", "/nonexistent/server")]);
        let err = manager.start("missing").await.err().unwrap();
        assert!(matches!(
            err,
            McpError::Startup { cause: StartupFailure::Spawn(_), .. }
        ));
        assert_eq!(manager.state("missing").unwrap(), ServerState::Registered);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let manager = manager_with(vec![
            ServerDescriptor::new("silent", "sh").with_args(["-c", "exec sleep 30"]),
        ]);
        let err = manager.start("silent").await.err().unwrap();
        assert!(matches!(
            err,
            McpError::Startup { cause: StartupFailure::Timeout(_), .. }
        ));
        assert_eq!(manager.state("silent").unwrap(), ServerState::Registered);
        assert!(manager.running().is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_process_is_noop() {
        let manager = manager_with(vec![ServerDescriptor::new("idle", "true")]);
        manager.stop("idle").await.unwrap();
        let status = manager.status("idle").unwrap();
        assert_eq!(status.state, ServerState::Registered);
        assert!(status.pid.is_none());
    }
}
