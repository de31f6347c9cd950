use std::time::Duration;

use crate::protocol::TurnResult;

/// Errors that can occur when driving an agent session.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time
/// - Request errors: rejected before anything is written to the agent
/// - Turn errors: the in-flight turn could not be completed
/// - Runtime errors: caller-side deadlines and abandoned turns
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time)
    // -------------------------------------------------------------------------
    /// No credential configured or resolvable.
    ///
    /// This occurs when using `AuthMethod::ApiKeyFromEnv` and the
    /// `ANTHROPIC_API_KEY` environment variable is unset or empty.
    #[error("no credential configured: set an API key or ANTHROPIC_API_KEY")]
    AuthNotConfigured,

    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Request errors
    // -------------------------------------------------------------------------
    /// The session was never started, has exited, or has been disposed.
    #[error("agent process not running")]
    NotRunning,

    /// The request text cannot be sent as a single protocol line.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A previous turn was abandoned before completing, so the output
    /// stream no longer lines up with requests.
    ///
    /// The session must be disposed and recreated.
    #[error("agent session is desynchronized: a previous turn was abandoned")]
    Desynchronized,

    // -------------------------------------------------------------------------
    // Turn errors
    // -------------------------------------------------------------------------
    /// Writing the request line to the agent's stdin failed.
    #[error("failed to write to agent process: {0}")]
    WriteFailure(#[source] std::io::Error),

    /// The agent's output closed before anything was produced for the turn.
    #[error("agent process ended unexpectedly")]
    StreamEndedEmpty,

    /// The agent's output closed after part of the turn was received but
    /// before the closing prompt.
    #[error("agent turn interrupted after {} entries", partial.len())]
    TurnInterrupted {
        /// Everything accumulated before the stream closed.
        partial: Box<TurnResult>,
    },

    /// The agent process failed to spawn or its output could not be read.
    #[error("agent process error: {message}")]
    ProcessError {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // -------------------------------------------------------------------------
    // Runtime errors
    // -------------------------------------------------------------------------
    /// Request exceeded the caller's deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// A specialized Result type for libagent operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a process error from an I/O failure.
    pub fn process(source: std::io::Error) -> Self {
        Self::ProcessError {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Check if this error means the agent process itself is gone or broken.
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            Error::NotRunning
                | Error::WriteFailure(_)
                | Error::StreamEndedEmpty
                | Error::TurnInterrupted { .. }
                | Error::ProcessError { .. }
        )
    }

    /// Check if recreating the session is expected to help.
    ///
    /// Nothing is retried internally; this only classifies the failure
    /// for callers that implement their own policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Desynchronized) || self.is_process_failure()
    }

    /// The partial turn carried by [`Error::TurnInterrupted`].
    pub fn partial_turn(&self) -> Option<&TurnResult> {
        match self {
            Error::TurnInterrupted { partial } => Some(partial),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::process(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, TurnEntry};

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn process_failure_detection() {
        assert!(Error::NotRunning.is_process_failure());
        assert!(Error::StreamEndedEmpty.is_process_failure());
        assert!(Error::process(std::io::Error::other("boom")).is_process_failure());
        assert!(!Error::InvalidMessage("empty".into()).is_process_failure());
        assert!(!Error::Timeout(Duration::from_secs(1)).is_process_failure());
    }

    #[test]
    fn is_retryable_detection() {
        assert!(Error::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(Error::Desynchronized.is_retryable());
        assert!(Error::StreamEndedEmpty.is_retryable());
        assert!(!Error::AuthNotConfigured.is_retryable());
        assert!(!Error::InvalidMessage("x".into()).is_retryable());
    }

    #[test]
    fn messages_pass_through() {
        assert_eq!(Error::NotRunning.to_string(), "agent process not running");
        assert_eq!(
            Error::StreamEndedEmpty.to_string(),
            "agent process ended unexpectedly"
        );
        let err = Error::process(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        assert_eq!(err.to_string(), "agent process error: pipe closed");
    }

    #[test]
    fn turn_interrupted_exposes_partial() {
        let mut partial = TurnResult::default();
        partial.push(TurnEntry::Message(Message::new("half")));
        let err = Error::TurnInterrupted {
            partial: Box::new(partial),
        };
        assert_eq!(err.to_string(), "agent turn interrupted after 1 entries");
        assert_eq!(err.partial_turn().map(TurnResult::len), Some(1));
        assert!(Error::NotRunning.partial_turn().is_none());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::ProcessError { source: Some(_), .. }));
    }

    #[test]
    fn question_mark_operator_io() {
        fn fallible_io() -> Result<()> {
            let _file = std::fs::File::open("/nonexistent/path/that/does/not/exist")?;
            Ok(())
        }
        assert!(matches!(fallible_io(), Err(Error::ProcessError { .. })));
    }
}
