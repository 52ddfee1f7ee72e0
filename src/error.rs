//! Error types shared by the search engine and its backends.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures detected before or around a run: bad configuration and
/// checkpoint persistence.
#[derive(Debug, Error)]
pub enum Error {
    #[error("minimum length must be at least 1")]
    ZeroMinLength,

    #[error("minimum length ({min}) must be less than or equal to maximum length ({max})")]
    LengthRange { min: usize, max: usize },

    #[error("thread count must be at least 1")]
    ZeroThreads,

    #[error("file not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("invalid library '{0}'")]
    UnknownBackend(String),

    #[error("checkpoint I/O error on {}: {source}", .path.display())]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed checkpoint {}: {source}", .path.display())]
    CheckpointFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write result file {}: {source}", .path.display())]
    ResultIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a verification backend, either while preparing or
/// while checking a single candidate.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("document is not encrypted")]
    NotEncrypted,

    #[error("backend '{0}' was used before it was prepared")]
    NotPrepared(&'static str),

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Backend(String),
}
