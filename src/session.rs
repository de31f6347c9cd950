//! Long-lived agent sessions.
//!
//! This module provides [`AgentSession`], which owns one agent REPL process
//! and turns each request line into a structured [`TurnResult`].
//!
//! # Example
//!
//! ```ignore
//! use libagent::{AgentSession, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = AgentSession::new("./bin/agent", "/path/to/workspace", "sk-ant-...")?;
//!     session.start();
//!
//!     let turn = session.send_message("List the files here").await?;
//!     for call in turn.tool_calls() {
//!         println!("tool: {}", call.name);
//!     }
//!     println!("{}", turn.text());
//!
//!     session.dispose();
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout as tokio_timeout;

use crate::config::{AgentConfig, AgentConfigBuilder, AuthMethod};
use crate::process::{AgentProcess, ProcessIo, ProcessReader};
use crate::protocol::{Step, TurnParser, TurnResult};
use crate::tools::TurnObserver;
use crate::{Error, Result};

/// A conversation with one agent REPL process.
///
/// The session is created stopped. [`start`](Self::start) spawns the agent,
/// [`dispose`](Self::dispose) kills it for good.
///
/// # Thread Safety
///
/// `AgentSession` is `Send + Sync` and can be shared across tasks behind an
/// `Arc`. Concurrent calls to [`send_message`](Self::send_message) are
/// serviced one turn at a time, in arrival order.
///
/// # Cancellation
///
/// A turn cannot be cancelled on its own. Dropping a `send_message` future
/// after its request was written leaves unread output behind, so every later
/// send fails with [`Error::Desynchronized`] until the session is recreated.
/// [`dispose`](Self::dispose) ends a turn in flight right away, even when a
/// process started by the agent still holds its stdout open.
pub struct AgentSession {
    config: Arc<AgentConfig>,
    disposed: AtomicBool,
    desynchronized: AtomicBool,
    supervisor: std::sync::Mutex<Supervisor>,
    /// Turn slot. Holding the lock is holding the turn.
    turn: Mutex<Option<ProcessIo>>,
    /// Flipped once by `dispose`; wakes the turn in flight.
    disposal: watch::Sender<bool>,
}

#[derive(Default)]
struct Supervisor {
    process: Option<AgentProcess>,
    /// I/O of a freshly spawned process, installed by the next turn.
    pending_io: Option<ProcessIo>,
    spawn_error: Option<String>,
}

impl AgentSession {
    /// Create a session for the agent at `bin_path`, run in `working_directory`.
    ///
    /// An empty `api_key` falls back to `ANTHROPIC_API_KEY` from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if no credential can be resolved or the working
    /// directory does not exist.
    pub fn new(
        bin_path: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Self::builder()
            .bin_path(bin_path)
            .working_directory(working_directory)
            .api_key(api_key)
            .fallback(AuthMethod::ApiKeyFromEnv)
            .build()
    }

    /// Create a session with the given configuration.
    pub fn with_config(config: AgentConfig) -> Self {
        Self {
            config: Arc::new(config),
            disposed: AtomicBool::new(false),
            desynchronized: AtomicBool::new(false),
            supervisor: std::sync::Mutex::new(Supervisor::default()),
            turn: Mutex::new(None),
            disposal: watch::channel(false).0,
        }
    }

    /// Create a builder for configuring a new session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Get the session configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Spawn the agent process.
    ///
    /// Does nothing if the agent is already running or the session has been
    /// disposed. A spawn failure is logged and reported by the next
    /// [`send_message`](Self::send_message); calling `start` again retries.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut supervisor = self.lock_supervisor();
        if self.is_disposed() {
            return;
        }
        if supervisor
            .process
            .as_ref()
            .is_some_and(AgentProcess::is_running)
        {
            return;
        }

        match AgentProcess::spawn(&self.config) {
            Ok((process, io)) => {
                supervisor.process = Some(process);
                supervisor.pending_io = Some(io);
                supervisor.spawn_error = None;
                // A fresh process has a fresh output stream.
                self.desynchronized.store(false, Ordering::SeqCst);
            }
            Err(e) => {
                tracing::error!(
                    bin = %self.config.bin_path().display(),
                    error = %e,
                    "failed to start agent process"
                );
                supervisor.process = None;
                supervisor.pending_io = None;
                supervisor.spawn_error = Some(match e {
                    Error::ProcessError { message, .. } => message,
                    other => other.to_string(),
                });
            }
        }
    }

    /// Kill the agent process and retire the session.
    ///
    /// Idempotent. A turn in flight ends with the stream-closed error; every
    /// later send fails with [`Error::NotRunning`] and `start` never respawns.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.disposal.send_replace(true);

        let mut supervisor = self.lock_supervisor();
        if let Some(mut process) = supervisor.process.take() {
            tracing::info!(pid = process.pid(), "disposing agent session");
            process.kill();
        }
        supervisor.pending_io = None;
        drop(supervisor);

        // An in-flight turn holds the slot and clears it once woken.
        if let Ok(mut slot) = self.turn.try_lock() {
            *slot = None;
        }
    }

    /// Check if the session has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Check if the agent process is alive.
    pub fn is_running(&self) -> bool {
        !self.is_disposed()
            && self
                .lock_supervisor()
                .process
                .as_ref()
                .is_some_and(AgentProcess::is_running)
    }

    /// Get the process ID of the running agent.
    pub fn pid(&self) -> Option<u32> {
        if self.is_disposed() {
            return None;
        }
        self.lock_supervisor()
            .process
            .as_ref()
            .filter(|p| p.is_running())
            .and_then(AgentProcess::pid)
    }

    /// Send one request line and wait for the agent's full reply.
    ///
    /// Resolves when the agent prints its prompt again. If a timeout is
    /// configured it bounds the whole call, including time spent queued
    /// behind other turns.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRunning`] if the session was never started, the agent
    ///   exited, or the session was disposed
    /// - [`Error::ProcessError`] if the last `start` failed to spawn
    /// - [`Error::Desynchronized`] if an earlier turn was abandoned
    /// - [`Error::InvalidMessage`] for empty or multi-line text
    /// - [`Error::WriteFailure`], [`Error::StreamEndedEmpty`],
    ///   [`Error::TurnInterrupted`] or [`Error::ProcessError`] if the turn
    ///   itself fails
    pub async fn send_message(&self, text: &str) -> Result<TurnResult> {
        match self.config.timeout() {
            Some(duration) => with_timeout(duration, self.run_turn(text)).await,
            None => self.run_turn(text).await,
        }
    }

    async fn run_turn(&self, text: &str) -> Result<TurnResult> {
        self.check_ready()?;
        validate_message(text)?;

        let mut slot = self.turn.lock().await;
        // Anything may have happened while queued.
        self.check_ready()?;
        if let Some(io) = self.lock_supervisor().pending_io.take() {
            *slot = Some(io);
        }
        let Some(io) = slot.as_mut() else {
            return Err(Error::NotRunning);
        };

        let parser = TurnParser::with_observer(self.config.observer().cloned());
        let mut guard = TurnGuard::new(&self.desynchronized);
        let result = exchange(io, text, parser, self.disposal.subscribe()).await;
        guard.disarm();

        if let Err(e) = &result {
            tracing::warn!(error = %e, "agent turn failed");
            if e.is_process_failure() {
                *slot = None;
            }
        }
        result
    }

    fn check_ready(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::NotRunning);
        }
        let supervisor = self.lock_supervisor();
        if let Some(message) = &supervisor.spawn_error {
            return Err(Error::ProcessError {
                message: message.clone(),
                source: None,
            });
        }
        if !supervisor
            .process
            .as_ref()
            .is_some_and(AgentProcess::is_running)
        {
            return Err(Error::NotRunning);
        }
        if self.desynchronized.load(Ordering::SeqCst) {
            return Err(Error::Desynchronized);
        }
        Ok(())
    }

    fn lock_supervisor(&self) -> std::sync::MutexGuard<'_, Supervisor> {
        self.supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("disposed", &self.is_disposed())
            .field(
                "desynchronized",
                &self.desynchronized.load(Ordering::SeqCst),
            )
            .finish()
    }
}

/// Marks the session desynchronized if a turn is dropped mid-flight.
struct TurnGuard<'a> {
    desynchronized: &'a AtomicBool,
    armed: bool,
}

impl<'a> TurnGuard<'a> {
    fn new(desynchronized: &'a AtomicBool) -> Self {
        Self {
            desynchronized,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.desynchronized.store(true, Ordering::SeqCst);
            tracing::warn!("agent turn abandoned before completion, session desynchronized");
        }
    }
}

/// Reject text the agent would not answer with exactly one turn.
///
/// The agent reads one line per request and re-prompts silently on blank
/// input.
fn validate_message(text: &str) -> Result<()> {
    if text.contains(['\n', '\r']) {
        return Err(Error::InvalidMessage(
            "message must be a single line".to_string(),
        ));
    }
    if text.trim().is_empty() {
        return Err(Error::InvalidMessage("message is empty".to_string()));
    }
    Ok(())
}

async fn exchange(
    io: &mut ProcessIo,
    text: &str,
    parser: TurnParser,
    mut disposal: watch::Receiver<bool>,
) -> Result<TurnResult> {
    tokio::select! {
        biased;
        () = disposed(&mut disposal) => return Err(Error::NotRunning),
        written = io.writer.write_line(text) => written.map_err(Error::WriteFailure)?,
    }
    drive_turn(&mut io.reader, parser, disposal).await
}

/// Feed output lines to `parser` until the turn completes, the stream ends or
/// the session is disposed.
///
/// Disposal counts as the stream closing: killing the agent does not close
/// stdout while a process it started still holds the pipe.
async fn drive_turn<R>(
    reader: &mut ProcessReader<R>,
    mut parser: TurnParser,
    mut disposal: watch::Receiver<bool>,
) -> Result<TurnResult>
where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            biased;
            () = disposed(&mut disposal) => {
                tracing::debug!("session disposed during turn");
                return Err(parser.into_closed_error());
            }
            line = reader.read_line() => match line {
                Ok(Some(line)) => {
                    if let Step::Complete(turn) = parser.feed(&line) {
                        return Ok(turn);
                    }
                }
                Ok(None) => return Err(parser.into_closed_error()),
                Err(e) => {
                    tracing::error!(error = %e, "failed to read agent output");
                    return Err(Error::process(e));
                }
            },
        }
    }
}

/// Resolves once the session is disposed. Never resolves if the session is gone.
async fn disposed(disposal: &mut watch::Receiver<bool>) {
    let closed = disposal.wait_for(|disposed| *disposed).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

/// Wrap a future with a timeout.
///
/// Returns [`Error::Timeout`] if the future doesn't complete in time.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio_timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(duration)),
    }
}

/// Builder for creating an [`AgentSession`] with custom configuration.
///
/// This wraps [`AgentConfigBuilder`] and provides a fluent API.
///
/// # Example
///
/// ```ignore
/// let session = AgentSession::builder()
///     .bin_path("./bin/agent")
///     .working_directory("/path/to/workspace")
///     .api_key_from_env()
///     .timeout(Duration::from_secs(300))
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    inner: AgentConfigBuilder,
}

impl SessionBuilder {
    /// Create a new session builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the session. The agent is not spawned until [`AgentSession::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if no credential can be resolved or the
    /// configuration is invalid.
    pub fn build(self) -> Result<AgentSession> {
        let config = self.inner.build()?;
        Ok(AgentSession::with_config(config))
    }

    // -------------------------------------------------------------------------
    // Authentication (delegated to AgentConfigBuilder)
    // -------------------------------------------------------------------------

    /// Use API key directly.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.inner = self.inner.api_key(key);
        self
    }

    /// Read API key from ANTHROPIC_API_KEY env var.
    pub fn api_key_from_env(mut self) -> Self {
        self.inner = self.inner.api_key_from_env();
        self
    }

    /// Add a fallback auth method.
    pub fn fallback(mut self, auth: AuthMethod) -> Self {
        self.inner = self.inner.fallback(auth);
        self
    }

    /// Set the environment variable the credential is injected as.
    pub fn credential_var(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.credential_var(name);
        self
    }

    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Set the agent executable.
    pub fn bin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.bin_path(path);
        self
    }

    /// Add an argument passed to the agent.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.inner = self.inner.arg(arg);
        self
    }

    /// Add arguments passed to the agent.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inner = self.inner.args(args);
        self
    }

    /// Set working directory.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.working_directory(path);
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.env(key, value);
        self
    }

    /// Set whether to inherit the parent environment.
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inner = self.inner.inherit_env(inherit);
        self
    }

    // -------------------------------------------------------------------------
    // Turn options
    // -------------------------------------------------------------------------

    /// Bound each `send_message` call.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.inner = self.inner.timeout(duration);
        self
    }

    /// Observe tool calls and completed turns.
    pub fn observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.inner = self.inner.observer(observer);
        self
    }
}
