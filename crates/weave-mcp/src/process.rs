//! Child process handling for stdio tool servers.
//!
//! A server is spawned with piped stdin/stdout/stderr. Stdout belongs to the
//! session; stderr is drained line by line into the log so a chatty server
//! can never block on a full pipe.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use weave_core::{ServerDescriptor, StartupFailure};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// How a stopped process went away.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownOutcome {
    pub status: Option<ExitStatus>,
    /// True when the grace period ran out and the process was killed.
    pub forced: bool,
}

/// A spawned tool server whose pipes have been handed out.
#[derive(Debug)]
pub struct ServerProcess {
    server: String,
    child: Child,
    pid: Option<u32>,
}

/// Pipes the session talks over.
#[derive(Debug)]
pub struct ServerPipes {
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

impl ServerProcess {
    /// Spawn the descriptor's command.
    ///
    /// The child inherits the host environment with the descriptor's `env`
    /// applied on top. The host's own environment is never modified.
    pub fn spawn(descriptor: &ServerDescriptor) -> Result<(Self, ServerPipes), StartupFailure> {
        let mut command = Command::new(&descriptor.command);
        command
            .args(&descriptor.args)
            .envs(&descriptor.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            StartupFailure::Spawn(format!(
                "failed to spawn '{}' {:?}: {e}",
                descriptor.command, descriptor.args
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StartupFailure::Spawn("child stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StartupFailure::Spawn("child stdout was not captured".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_reader(stderr, descriptor.name.clone());
        }

        let pid = child.id();
        tracing::debug!(server = %descriptor.name, pid = ?pid, "Spawned tool server process");

        Ok((
            Self {
                server: descriptor.name.clone(),
                child,
                pid,
            },
            ServerPipes { stdin, stdout },
        ))
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking exit check. `Some` carries the exit status once the
    /// process is gone.
    pub fn try_exit(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(server = %self.server, error = %e, "try_wait failed");
                None
            }
        }
    }

    /// Wait up to `within` for the process to exit on its own.
    pub async fn wait_exit(&mut self, within: Duration) -> Option<ExitStatus> {
        if let Some(status) = self.try_exit() {
            return Some(status);
        }
        match tokio::time::timeout(within, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::debug!(server = %self.server, error = %e, "wait failed");
                None
            }
            Err(_) => None,
        }
    }

    /// Terminate the process: polite signal, grace period, then kill.
    /// Always waits for the process to be reaped.
    pub async fn shutdown(mut self, grace: Duration) -> io::Result<ShutdownOutcome> {
        if let Some(status) = self.try_exit() {
            return Ok(ShutdownOutcome {
                status: Some(status),
                forced: false,
            });
        }

        #[cfg(unix)]
        {
            self.shutdown_unix(grace).await
        }

        #[cfg(not(unix))]
        {
            let _ = grace;
            self.child.kill().await?;
            let status = self.child.wait().await?;
            Ok(ShutdownOutcome {
                status: Some(status),
                forced: true,
            })
        }
    }

    #[cfg(unix)]
    async fn shutdown_unix(&mut self, grace: Duration) -> io::Result<ShutdownOutcome> {
        let raw_pid = self
            .pid
            .and_then(|pid| i32::try_from(pid).ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "child has no PID"))?;

        if let Err(e) = signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
            if e == nix::errno::Errno::ESRCH {
                let status = self.child.wait().await?;
                return Ok(ShutdownOutcome {
                    status: Some(status),
                    forced: false,
                });
            }
            return Err(io::Error::other(e));
        }

        if let Ok(result) = tokio::time::timeout(grace, self.child.wait()).await {
            return Ok(ShutdownOutcome {
                status: Some(result?),
                forced: false,
            });
        }

        tracing::warn!(
            server = %self.server,
            grace_ms = grace.as_millis(),
            "Tool server ignored SIGTERM, killing"
        );
        self.child.kill().await?;
        let status = self.child.wait().await?;
        Ok(ShutdownOutcome {
            status: Some(status),
            forced: true,
        })
    }
}

/// Forward every stderr line to the debug log until EOF.
///
/// Bytes are decoded lossily; `lines()` would end the task on invalid UTF-8.
fn spawn_stderr_reader(stream: impl AsyncRead + Unpin + Send + 'static, server: String) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(trim_line(&buf));
                    tracing::debug!(server = %server, "stderr: {line}");
                }
                Err(e) => {
                    tracing::debug!(server = %server, error = %e, "stderr reader exiting on read error");
                    break;
                }
            }
        }
    });
}

/// Strip a trailing `\n` or `\r\n`.
pub(crate) fn trim_line(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
