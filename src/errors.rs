// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Failures below the orchestrator (spawn, timeout, kill, remote transport and
//! protocol, validation) are normally folded into an
//! [`ExecutionResult`](crate::types::ExecutionResult) message. The variants
//! exist so the runner and client can name the cause before that happens, and
//! so configuration / rejection errors have a structured form.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start '{program}': {reason}")]
    SpawnFailure { program: String, reason: String },

    #[error("failed to collect exit status of '{program}': {reason}")]
    WaitFailure { program: String, reason: String },

    #[error("process '{program}' timed out after {timeout_ms} ms and was terminated")]
    Timeout { program: String, timeout_ms: u128 },

    #[error("process '{program}' was killed by user request")]
    UserKilled { program: String },

    #[error("remote request failed: {0}")]
    RemoteTransport(String),

    #[error("{0}")]
    RemoteProtocol(String),

    #[error("missing required parameter: {0}")]
    Validation(&'static str),

    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ExecError {
    fn from(err: reqwest::Error) -> Self {
        ExecError::RemoteTransport(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExecError>;
