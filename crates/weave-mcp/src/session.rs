//! JSON-RPC session over a server's stdio pipes.
//!
//! A background reader task owns stdout and routes each line by response id
//! into a table of pending requests. Lines that cannot be matched (non-JSON,
//! notifications, peer requests, unknown ids) are discarded. An exchange
//! lock keeps at most one request in flight per session, so a request is
//! written and answered before the next one is sent.
//!
//! Closing paths:
//! - stdout EOF or read error: every waiter fails with a transport error and
//!   the session refuses new requests
//! - `cancel()`: every waiter fails with `Cancelled` immediately
//! - a flood of unmatched lines while requests wait: those waiters fail with a
//!   protocol error; the session stays usable

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use weave_core::{McpError, StartupFailure};

use crate::process::{ServerPipes, trim_line};
use crate::protocol::{
    JsonRpcMessage, JsonRpcRequest, METHOD_INITIALIZE, METHOD_INITIALIZED, Reply,
    initialize_params,
};
use crate::settings::McpSettings;

type Waiter = oneshot::Sender<Result<Reply, McpError>>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

#[derive(Default)]
struct PendingState {
    waiters: HashMap<u64, (String, Waiter)>,
    closed: Option<String>,
}

/// Requests waiting for a response, keyed by id.
struct PendingTable {
    server: String,
    state: StdMutex<PendingState>,
}

impl PendingTable {
    fn new(server: String) -> Self {
        Self {
            server,
            state: StdMutex::new(PendingState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: u64, method: &str, waiter: Waiter) -> Result<(), McpError> {
        let mut state = self.lock();
        if let Some(reason) = &state.closed {
            return Err(McpError::transport(&self.server, reason.clone()));
        }
        state.waiters.insert(id, (method.to_string(), waiter));
        Ok(())
    }

    fn remove(&self, id: u64) {
        self.lock().waiters.remove(&id);
    }

    /// Hand a reply to its waiter. False if nobody waits for `id`.
    fn deliver(&self, id: u64, reply: Result<Reply, McpError>) -> bool {
        let Some((_, waiter)) = self.lock().waiters.remove(&id) else {
            return false;
        };
        // The caller may have given up in the meantime.
        let _ = waiter.send(reply);
        true
    }

    fn has_waiters(&self) -> bool {
        !self.lock().waiters.is_empty()
    }

    fn fail_all(&self, make_error: impl Fn(&str) -> McpError) {
        let waiters: Vec<_> = self.lock().waiters.drain().collect();
        for (_, (method, waiter)) in waiters {
            let _ = waiter.send(Err(make_error(&method)));
        }
    }

    /// Refuse new requests and fail the waiting ones.
    fn close(&self, reason: &str) {
        let waiters: Vec<_> = {
            let mut state = self.lock();
            state.closed.get_or_insert_with(|| reason.to_string());
            state.waiters.drain().collect()
        };
        for (_, (_, waiter)) in waiters {
            let _ = waiter.send(Err(McpError::transport(&self.server, reason)));
        }
    }

    fn closed_reason(&self) -> Option<String> {
        self.lock().closed.clone()
    }
}

/// Removes a pending entry when the request future finishes or is dropped.
struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}

/// One JSON-RPC conversation with one server process.
pub struct Session {
    server: String,
    writer: Mutex<BoxedWriter>,
    exchange: Mutex<()>,
    pending: Arc<PendingTable>,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl Session {
    /// Start a session over a spawned process's pipes.
    pub fn start(server: impl Into<String>, pipes: ServerPipes, max_stray_lines: usize) -> Self {
        Self::from_io(server, pipes.stdin, pipes.stdout, max_stray_lines)
    }

    /// Start a session over arbitrary byte streams.
    pub fn from_io(
        server: impl Into<String>,
        writer: impl AsyncWrite + Unpin + Send + 'static,
        reader: impl AsyncRead + Unpin + Send + 'static,
        max_stray_lines: usize,
    ) -> Self {
        let server = server.into();
        let pending = Arc::new(PendingTable::new(server.clone()));
        let cancel = CancellationToken::new();

        tokio::spawn(read_loop(
            reader,
            Arc::clone(&pending),
            cancel.clone(),
            max_stray_lines,
        ));

        Self {
            server,
            writer: Mutex::new(Box::new(writer)),
            exchange: Mutex::new(()),
            pending,
            next_id: AtomicU64::new(1),
            cancel,
        }
    }

    /// True once the peer's output has ended or the session was cancelled.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.pending.closed_reason().is_some()
    }

    /// Abort every in-flight and queued request with `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Send a request and wait for its response.
    ///
    /// The deadline starts once this request holds the exchange lock and
    /// covers both writing the request and waiting for the answer. On timeout
    /// the request is forgotten; a late response is discarded. A timeout in
    /// the middle of a write closes the session, since the peer's input may
    /// hold a partial line.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Reply, McpError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(McpError::Cancelled {
                server: self.server.clone(),
            }),
            result = self.send_and_wait(method, params, timeout) => result,
        }
    }

    async fn send_and_wait(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Reply, McpError> {
        let _exchange = self.exchange.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = JsonRpcRequest::call(id, method, params)
            .to_line()
            .map_err(|e| McpError::protocol(&self.server, format!("unserializable request: {e}")))?;

        let (sender, receiver) = oneshot::channel();
        self.pending.insert(id, method, sender)?;
        let _guard = PendingGuard {
            table: &self.pending,
            id,
        };

        tracing::trace!(server = %self.server, id, method, "Sending request");
        let mut written = false;
        let exchange = async {
            self.write_line(&line).await?;
            written = true;
            match receiver.await {
                Ok(result) => result,
                Err(_) => Err(McpError::transport(&self.server, "session reader stopped")),
            }
        };
        let outcome = tokio::time::timeout(timeout, exchange).await;

        outcome.unwrap_or_else(|_| {
            if written {
                tracing::debug!(server = %self.server, id, method, "Request timed out");
            } else {
                tracing::warn!(server = %self.server, id, method, "Server stopped reading its input");
                self.pending
                    .close(&format!("write of '{method}' did not complete within the deadline"));
            }
            Err(self.timeout_error(method, timeout))
        })
    }

    fn timeout_error(&self, method: &str, timeout: Duration) -> McpError {
        McpError::Timeout {
            server: self.server.clone(),
            method: method.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Send a notification. No response is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        if self.cancel.is_cancelled() {
            return Err(McpError::Cancelled {
                server: self.server.clone(),
            });
        }
        let line = JsonRpcRequest::notification(method, params)
            .to_line()
            .map_err(|e| McpError::protocol(&self.server, format!("unserializable request: {e}")))?;
        self.write_line(&line).await
    }

    async fn write_line(&self, line: &[u8]) -> Result<(), McpError> {
        if let Some(reason) = self.pending.closed_reason() {
            return Err(McpError::transport(&self.server, reason));
        }
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line)
            .await
            .map_err(|e| McpError::transport(&self.server, format!("write to server failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| McpError::transport(&self.server, format!("flush to server failed: {e}")))
    }

    /// Run the `initialize` handshake and send `notifications/initialized`.
    ///
    /// Both messages share the init timeout. Returns the peer's `initialize`
    /// result.
    pub async fn initialize(&self, settings: &McpSettings) -> Result<Value, StartupFailure> {
        let deadline = tokio::time::Instant::now() + settings.init_timeout;
        let reply = self
            .request(
                METHOD_INITIALIZE,
                Some(initialize_params(settings)),
                settings.init_timeout,
            )
            .await
            .map_err(|e| match e {
                McpError::Timeout { .. } => StartupFailure::Timeout(settings.init_timeout),
                McpError::Protocol { reason, .. } => StartupFailure::Rejected(reason),
                other => StartupFailure::Transport(other.to_string()),
            })?;

        let result = match reply {
            Reply::Result(result @ Value::Object(_)) => result,
            Reply::Result(other) => {
                return Err(StartupFailure::Rejected(format!(
                    "initialize result is not an object: {other}"
                )));
            }
            Reply::Error(err) => {
                return Err(StartupFailure::Rejected(format!(
                    "[{}] {}",
                    err.code, err.message
                )));
            }
        };

        tokio::time::timeout_at(deadline, self.notify(METHOD_INITIALIZED, None))
            .await
            .map_err(|_| StartupFailure::Timeout(settings.init_timeout))?
            .map_err(|e| StartupFailure::Transport(e.to_string()))?;

        Ok(result)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_loop(
    stdout: impl AsyncRead + Unpin + Send,
    pending: Arc<PendingTable>,
    cancel: CancellationToken,
    max_stray_lines: usize,
) {
    let server = pending.server.clone();
    let mut reader = BufReader::new(stdout);
    let mut buf: Vec<u8> = Vec::with_capacity(4096);
    let mut strays = 0usize;

    let reason = loop {
        buf.clear();
        let read = tokio::select! {
            () = cancel.cancelled() => break "session cancelled".to_string(),
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => break "server closed its output".to_string(),
            Ok(_) => {}
            Err(e) => break format!("read from server failed: {e}"),
        }

        let line = trim_line(&buf);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match route_line(line, &pending) {
            Ok(()) => strays = 0,
            Err(why) => {
                tracing::debug!(server = %server, "Discarding unmatched output ({why}): {}", String::from_utf8_lossy(line));
                if !pending.has_waiters() {
                    strays = 0;
                    continue;
                }
                strays += 1;
                if strays > max_stray_lines {
                    tracing::warn!(server = %server, strays, "Too many unmatched lines, failing pending requests");
                    pending.fail_all(|method| {
                        McpError::protocol(
                            &server,
                            format!("no response to '{method}' among {strays} unmatched output lines"),
                        )
                    });
                    strays = 0;
                }
            }
        }
    };

    tracing::debug!(server = %server, reason = %reason, "Session reader exiting");
    pending.close(&reason);
}

/// Deliver a line to its waiter, or say why it could not be matched.
fn route_line(line: &[u8], pending: &PendingTable) -> Result<(), &'static str> {
    let message: JsonRpcMessage = serde_json::from_slice(line).map_err(|_| "not JSON-RPC")?;
    if message.method.is_some() {
        return Err("peer request or notification");
    }
    let id = message.response_id().ok_or("no usable id")?;
    let reply = Reply::try_from(message).map_err(|reason| {
        McpError::protocol(&pending.server, format!("malformed response to request {id}: {reason}"))
    });
    if pending.deliver(id, reply) {
        Ok(())
    } else {
        Err("unknown id")
    }
}
