//! Handles to running conversion processes.
//!
//! [`ProcessHandle`] is the seam between the registry and the operating
//! system: the registry only ever kills and awaits through it, which lets tests
//! substitute scripted handles. [`ChildHandle`] is the real implementation; it
//! hands the child to a supervisor task that owns the `wait` and performs the
//! kill when asked.

use std::fmt;
use std::process::ExitStatus;

use async_trait::async_trait;
use streamgate_common::{KillError, StreamId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// How a conversion process ended.
///
/// Every variant means the stream is stopped; the distinction only matters
/// for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited on its own. `code` is `None` when it was terminated
    /// by a signal nobody here sent.
    Exited { code: Option<i32> },
    /// The process was killed at our request.
    Killed,
    /// Waiting on the process failed; its state is unknown.
    WaitFailed(String),
}

impl ExitOutcome {
    /// Classify an exit status reported by the OS.
    pub fn from_status(status: ExitStatus) -> Self {
        Self::Exited {
            code: status.code(),
        }
    }

    /// True for a clean exit with status 0.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }

    /// True when the exit was requested through [`ProcessHandle::kill`].
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::Killed)
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited { code: Some(code) } => write!(f, "exited with status {code}"),
            Self::Exited { code: None } => write!(f, "terminated by signal"),
            Self::Killed => write!(f, "killed"),
            Self::WaitFailed(e) => write!(f, "wait failed: {e}"),
        }
    }
}

/// A running (or finished) external process owned by one stream record.
#[async_trait]
pub trait ProcessHandle: Send + Sync + fmt::Debug {
    /// OS process id, if known.
    fn pid(&self) -> Option<u32>;

    /// Ask the process to terminate.
    ///
    /// Returns once the kill has been issued, not once the process is gone.
    /// Fails with [`KillError::AlreadyExited`] if the process already ended.
    fn kill(&self) -> Result<(), KillError>;

    /// Wait for the process to end.
    ///
    /// May be awaited from several tasks; all of them observe the same outcome.
    async fn wait(&self) -> ExitOutcome;
}

/// [`ProcessHandle`] for a `tokio::process::Child`.
#[derive(Debug)]
pub struct ChildHandle {
    pid: Option<u32>,
    kill: CancellationToken,
    exit: watch::Receiver<Option<ExitOutcome>>,
}

impl ChildHandle {
    /// Take ownership of a spawned child and start supervising it.
    ///
    /// Must be called from within a Tokio runtime. If the child's stderr was
    /// piped, it is forwarded to the log at trace level.
    pub fn supervise(stream_id: &StreamId, mut child: Child) -> Self {
        let pid = child.id();
        let kill = CancellationToken::new();
        let (exit_tx, exit_rx) = watch::channel(None);

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stream_id.clone(), stderr));
        }

        tokio::spawn(supervise(stream_id.clone(), child, kill.clone(), exit_tx));

        Self {
            pid,
            kill,
            exit: exit_rx,
        }
    }

    /// Whether the supervisor has observed the process exit.
    pub fn has_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }
}

#[async_trait]
impl ProcessHandle for ChildHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn kill(&self) -> Result<(), KillError> {
        if self.has_exited() {
            return Err(KillError::AlreadyExited);
        }
        self.kill.cancel();
        Ok(())
    }

    async fn wait(&self) -> ExitOutcome {
        let mut exit = self.exit.clone();
        let outcome = match exit.wait_for(Option::is_some).await {
            Ok(outcome) => outcome
                .clone()
                .unwrap_or_else(|| ExitOutcome::WaitFailed("no exit status recorded".into())),
            Err(_) => ExitOutcome::WaitFailed("supervisor task ended".into()),
        };
        outcome
    }
}

async fn supervise(
    stream_id: StreamId,
    mut child: Child,
    kill: CancellationToken,
    exit_tx: watch::Sender<Option<ExitOutcome>>,
) {
    let outcome = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ExitOutcome::from_status(status),
            Err(e) => ExitOutcome::WaitFailed(e.to_string()),
        },
        _ = kill.cancelled() => {
            if let Err(e) = child.start_kill() {
                warn!(stream_id = %stream_id, error = %e, "Failed to kill process");
            }
            match child.wait().await {
                Ok(_) => ExitOutcome::Killed,
                Err(e) => ExitOutcome::WaitFailed(e.to_string()),
            }
        }
    };

    debug!(stream_id = %stream_id, outcome = %outcome, "Process ended");
    exit_tx.send_replace(Some(outcome));
}

async fn forward_stderr(stream_id: StreamId, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        trace!(stream_id = %stream_id, "ffmpeg: {}", line);
    }
}
