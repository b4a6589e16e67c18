//! Error types for tn3270wright.

use std::time::Duration;

/// Result type alias using Tn3270Error.
pub type Result<T> = std::result::Result<T, Tn3270Error>;

/// Errors that can occur when driving the emulator.
#[derive(Debug, thiserror::Error)]
pub enum Tn3270Error {
    /// Caller input rejected before any I/O.
    #[error("{0}")]
    Validation(String),

    /// A command was issued before the emulator process was started.
    #[error("s3270 not started")]
    NotStarted,

    /// Failed to launch the emulator or capture its pipes.
    #[error("failed to start s3270: {0}")]
    Spawn(String),

    /// Writing a command to the emulator failed.
    #[error("failed to send command {command}: {source}")]
    Write {
        /// The command being sent.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Reading the reply from the emulator failed.
    #[error("failed to read response to {command}: {source}")]
    Read {
        /// The command whose reply was being read.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The emulator answered with an `error` line.
    #[error("s3270 error: {message} (command: {command})")]
    Protocol {
        /// Message following the `error` keyword.
        message: String,
        /// The command that failed.
        command: String,
    },

    /// Timeout waiting for a condition.
    #[error("timeout after {timeout:?} waiting for {condition}")]
    Timeout {
        /// The condition that was being waited for.
        condition: String,
        /// How long we waited.
        timeout: Duration,
    },

    /// The caller cancelled a wait.
    #[error("wait cancelled")]
    Cancelled,

    /// Connecting to the host failed.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        /// `host:port` that was dialed.
        target: String,
        /// Cause reported by the emulator.
        #[source]
        source: Box<Tn3270Error>,
    },

    /// A screenshot path was rejected.
    #[error("{0}")]
    InvalidPath(String),

    /// Screenshot capture failed.
    #[error("failed to {action}: {source}")]
    Screenshot {
        /// What was being done.
        action: &'static str,
        /// Cause.
        #[source]
        source: Box<Tn3270Error>,
    },

    /// File-system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    /// Steps file could not be loaded or executed.
    #[error("steps error: {0}")]
    Steps(String),
}

impl Tn3270Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Tn3270Error::Validation(msg.into())
    }

    /// Returns true when the error came from caller input validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Tn3270Error::Validation(_))
    }
}
