// src/remote/envelope.rs

//! Compile response parsing and normalization.
//!
//! The service answers plain compiles, executor requests and
//! compile-with-execute using the same JSON shape, and does not say which one
//! happened. [`RemoteResponseEnvelope::parse`] works that out once, from
//! which optional fields are populated, and the accessors then read the right
//! fields for that shape.

use serde::Deserialize;

use crate::errors::ExecError;
use crate::types::ExecutionResult;

/// Heading placed between compiler stderr and program stderr.
pub const RUNTIME_STDERR_LABEL: &str = "Program stderr:";

/// `{"text": "..."}` entry of `stdout`, `stderr` and `asm`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputLine {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildResult {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub stdout: Option<Vec<OutputLine>>,
    #[serde(default)]
    pub stderr: Option<Vec<OutputLine>>,
}

/// The wire envelope. `exec_result` nests another full envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnvelope {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub did_execute: Option<bool>,
    #[serde(default)]
    pub stdout: Option<Vec<OutputLine>>,
    #[serde(default)]
    pub stderr: Option<Vec<OutputLine>>,
    #[serde(default)]
    pub build_result: Option<BuildResult>,
    #[serde(default)]
    pub asm: Option<Vec<OutputLine>>,
    #[serde(default)]
    pub exec_result: Option<Box<RawEnvelope>>,
}

/// A parsed response, tagged with the operation the server performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResponseEnvelope {
    /// Compile without a run: no `execResult`, no `buildResult`, not executed.
    CompileOnly { compile: RawEnvelope },
    /// Executor request: the outer envelope is the run; `buildResult` is the
    /// wrapper's own compile step.
    ExecuteOnly { execution: RawEnvelope },
    /// Compile with `execResult` nested inside.
    CompileAndExecute {
        compile: RawEnvelope,
        execution: RawEnvelope,
    },
}

impl RemoteResponseEnvelope {
    /// Parse a response body and classify it.
    pub fn parse(body: &str) -> Result<Self, ExecError> {
        if body.trim().is_empty() {
            return Err(ExecError::RemoteProtocol(
                "remote service returned an empty response".to_string(),
            ));
        }

        let raw: Option<RawEnvelope> = serde_json::from_str(body).map_err(|e| {
            ExecError::RemoteProtocol(format!("failed to parse remote response: {e}"))
        })?;

        let raw = raw.ok_or_else(|| {
            ExecError::RemoteProtocol(
                "failed to parse remote response: response was null".to_string(),
            )
        })?;

        Ok(Self::classify(raw))
    }

    pub fn classify(mut raw: RawEnvelope) -> Self {
        if let Some(execution) = raw.exec_result.take() {
            return RemoteResponseEnvelope::CompileAndExecute {
                compile: raw,
                execution: *execution,
            };
        }
        if raw.build_result.is_some() || raw.did_execute == Some(true) {
            RemoteResponseEnvelope::ExecuteOnly { execution: raw }
        } else {
            RemoteResponseEnvelope::CompileOnly { compile: raw }
        }
    }

    /// The envelope holding compiler-level fields (`asm`, outer streams).
    fn outer(&self) -> &RawEnvelope {
        match self {
            RemoteResponseEnvelope::CompileOnly { compile } => compile,
            RemoteResponseEnvelope::ExecuteOnly { execution } => execution,
            RemoteResponseEnvelope::CompileAndExecute { compile, .. } => compile,
        }
    }

    pub fn stdout(&self) -> String {
        match self {
            RemoteResponseEnvelope::CompileAndExecute { execution, .. } => {
                join_lines(execution.stdout.as_deref())
            }
            _ => join_lines(self.outer().stdout.as_deref()),
        }
    }

    pub fn stderr(&self) -> String {
        match self {
            RemoteResponseEnvelope::CompileOnly { compile } => {
                join_lines(compile.stderr.as_deref())
            }
            RemoteResponseEnvelope::ExecuteOnly { execution } => {
                let build = join_lines(
                    execution
                        .build_result
                        .as_ref()
                        .and_then(|b| b.stderr.as_deref()),
                );
                if build.is_empty() {
                    join_lines(execution.stderr.as_deref())
                } else {
                    build
                }
            }
            RemoteResponseEnvelope::CompileAndExecute { compile, execution } => merge_stderr(
                &join_lines(compile.stderr.as_deref()),
                &join_lines(execution.stderr.as_deref()),
            ),
        }
    }

    /// Assembly always comes from the outer envelope.
    pub fn assembly(&self) -> Option<String> {
        let asm = join_lines(self.outer().asm.as_deref());
        (!asm.is_empty()).then_some(asm)
    }

    /// Exit code of the step that decides success: the run when there was
    /// one, otherwise the compile.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RemoteResponseEnvelope::CompileAndExecute { execution, .. } => execution.code,
            _ => self.outer().code,
        }
    }

    pub fn into_result(self) -> ExecutionResult {
        ExecutionResult {
            stdout: self.stdout(),
            stderr: self.stderr(),
            assembly: self.assembly(),
            error_message: None,
            succeeded: self.exit_code().unwrap_or(0) == 0,
        }
    }
}

fn join_lines(lines: Option<&[OutputLine]>) -> String {
    lines
        .unwrap_or_default()
        .iter()
        .map(|l| l.text.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn merge_stderr(compile: &str, runtime: &str) -> String {
    match (compile.is_empty(), runtime.is_empty()) {
        (true, _) => runtime.to_string(),
        (false, true) => compile.to_string(),
        (false, false) => format!("{compile}\n\n{RUNTIME_STDERR_LABEL}\n{runtime}"),
    }
}
