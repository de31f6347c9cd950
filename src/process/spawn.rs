//! Process spawning and lifecycle management.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;

use super::io::{ProcessReader, ProcessWriter, StderrReader};
use crate::config::AgentConfig;
use crate::{Error, Result};

/// The turn-side ends of a running agent: its stdin and stdout.
pub struct ProcessIo {
    pub writer: ProcessWriter,
    pub reader: ProcessReader<ChildStdout>,
}

/// A running agent REPL process.
///
/// The child itself is owned by a background watcher task that reaps it on
/// exit and logs the exit status. This handle only observes liveness and
/// requests termination.
///
/// # Cancellation
///
/// Dropping an `AgentProcess` kills the subprocess if it's still running.
pub struct AgentProcess {
    pid: Option<u32>,
    alive: Arc<AtomicBool>,
    kill: Option<oneshot::Sender<()>>,
}

impl AgentProcess {
    /// Spawn the agent binary described by `config`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: &AgentConfig) -> Result<(Self, ProcessIo)> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::ProcessError {
                message: "spawning the agent requires a Tokio runtime".to_string(),
                source: None,
            });
        }

        let mut cmd = build_command(config);
        let mut child = cmd.spawn().map_err(|e| spawn_error(config, e))?;
        let pid = child.id();

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.start_kill();
            return Err(Error::ProcessError {
                message: "agent process is missing a piped stdio handle".to_string(),
                source: None,
            });
        };

        tokio::spawn(StderrReader::new(stderr).forward_to_log(pid));

        let alive = Arc::new(AtomicBool::new(true));
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(watch(child, kill_rx, Arc::clone(&alive), pid));

        tracing::info!(pid, bin = %config.bin_path().display(), "agent process started");

        let process = Self {
            pid,
            alive,
            kill: Some(kill_tx),
        };
        let io = ProcessIo {
            writer: ProcessWriter::new(stdin),
            reader: ProcessReader::new(stdout),
        };
        Ok((process, io))
    }

    /// Get the process ID of the agent.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Check if the process is still running.
    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Ask the watcher to kill the process. Does not wait for it to exit.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for AgentProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

impl std::fmt::Debug for AgentProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentProcess")
            .field("pid", &self.pid)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Own the child until it exits or a kill is requested.
async fn watch(
    mut child: Child,
    kill: oneshot::Receiver<()>,
    alive: Arc<AtomicBool>,
    pid: Option<u32>,
) {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => tracing::info!(pid, %status, "agent process exited"),
            Ok(status) => tracing::warn!(pid, %status, "agent process exited"),
            Err(e) => tracing::error!(pid, error = %e, "failed to wait on agent process"),
        },
        // Fires on an explicit kill and when the handle is dropped.
        _ = kill => {
            match child.kill().await {
                Ok(()) => tracing::debug!(pid, "agent process killed"),
                Err(e) => tracing::warn!(pid, error = %e, "failed to kill agent process"),
            }
        }
    }
    alive.store(false, Ordering::SeqCst);
}

/// Build a tokio Command from the config.
fn build_command(config: &AgentConfig) -> Command {
    let mut cmd = Command::new(config.bin_path());
    cmd.args(&config.args);

    if let Some(dir) = config.working_directory() {
        cmd.current_dir(dir);
    }

    if !config.inherit_env {
        cmd.env_clear();
    }

    // Credential goes last so it wins over custom vars
    cmd.envs(config.build_env());

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

fn spawn_error(config: &AgentConfig, e: std::io::Error) -> Error {
    let message = if e.kind() == std::io::ErrorKind::NotFound {
        format!("agent binary not found: {}", config.bin_path().display())
    } else {
        format!("failed to spawn {}: {e}", config.bin_path().display())
    };
    Error::ProcessError {
        message,
        source: Some(e),
    }
}
