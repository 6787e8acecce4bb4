// src/types.rs

//! Shared value types: host OS, execution requests and results.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Host operating system, as far as interpreter selection is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Windows,
    Linux,
    Mac,
    Unknown,
}

impl HostOs {
    /// Detect the OS this binary was built for.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => HostOs::Windows,
            "linux" => HostOs::Linux,
            "macos" => HostOs::Mac,
            _ => HostOs::Unknown,
        }
    }

    pub const ALL: [HostOs; 4] = [HostOs::Windows, HostOs::Linux, HostOs::Mac, HostOs::Unknown];
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostOs::Windows => "windows",
            HostOs::Linux => "linux",
            HostOs::Mac => "mac",
            HostOs::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for HostOs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "windows" => Ok(HostOs::Windows),
            "linux" => Ok(HostOs::Linux),
            "mac" | "macos" | "darwin" => Ok(HostOs::Mac),
            "unknown" => Ok(HostOs::Unknown),
            other => Err(format!(
                "invalid host os: {other} (expected windows, linux, mac or unknown)"
            )),
        }
    }
}

/// Snapshot of everything needed to run a snippet.
///
/// Taken by value at dispatch time; the orchestrator never hands out a
/// mutable reference to an in-flight request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub source_text: String,
    /// Snippet file extension, with or without the leading dot.
    pub language_extension: String,
    /// Remote compiler id; on the local path, an interpreter key that
    /// overrides `language_extension`.
    pub target_id: Option<String>,
    pub user_flags: String,
    pub want_assembly: bool,
}

impl ExecutionRequest {
    pub fn new(source_text: impl Into<String>, language_extension: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            language_extension: language_extension.into(),
            ..Self::default()
        }
    }
}

/// Canonical outcome of a local or remote run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub assembly: Option<String>,
    pub error_message: Option<String>,
    pub succeeded: bool,
}

impl ExecutionResult {
    /// A failed result with no output, only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}
