//! Error types shared by the registry and the process launcher.
//!
//! [`Error`] is what callers of the stream registry see. [`LaunchError`] and
//! [`KillError`] come from the launcher; a launch failure is wrapped into
//! [`Error::Launch`], while [`KillError::AlreadyExited`] is absorbed by every
//! internal caller and never reaches the outside.

use std::fmt;
use std::path::PathBuf;

/// Failure to start an external conversion process.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The per-stream output directory could not be created or written.
    #[error("output directory unavailable: {}: {source}", path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external process could not be spawned.
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Create a DirectoryUnavailable error.
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create a SpawnFailed error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }
}

/// Failure to signal a running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KillError {
    /// The process had already exited before the kill was requested.
    #[error("process already exited")]
    AlreadyExited,
}

/// Errors returned by stream registry operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No record exists for the identifier.
    #[error("stream not found: {0}")]
    NotFound(String),

    /// The record exists but its process is no longer running.
    #[error("stream is not active: {0}")]
    Inactive(String),

    /// The identifier cannot be used as a stream id.
    #[error("invalid stream id: {0}")]
    InvalidId(String),

    /// The conversion process could not be started.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The record was removed but its output directory could not be deleted.
    #[error("failed to remove artifacts for {id}: {source}")]
    Cleanup {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::NotFound(id.to_string())
    }

    /// Create a new Inactive error.
    pub fn inactive(id: impl fmt::Display) -> Self {
        Self::Inactive(id.to_string())
    }

    /// Create a new InvalidId error.
    pub fn invalid_id<S: Into<String>>(msg: S) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create a new Cleanup error.
    pub fn cleanup(id: impl fmt::Display, source: std::io::Error) -> Self {
        Self::Cleanup {
            id: id.to_string(),
            source,
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Inactive(_) => 409,
            Error::InvalidId(_) => 400,
            Error::Launch(LaunchError::DirectoryUnavailable { .. }) => 500,
            Error::Launch(LaunchError::SpawnFailed { .. }) => 502,
            Error::Cleanup { .. } => 500,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Inactive(_) => "inactive",
            Error::InvalidId(_) => "invalid_id",
            Error::Launch(LaunchError::DirectoryUnavailable { .. }) => "directory_unavailable",
            Error::Launch(LaunchError::SpawnFailed { .. }) => "spawn_failed",
            Error::Cleanup { .. } => "cleanup_failed",
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
