// src/engine/orchestrator.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::{CompilerCatalog, ConfigFile, RunnerSection};
use crate::engine::ansi::strip_ansi;
use crate::engine::handle::RunningProcessHandle;
use crate::errors::{ExecError, Result};
use crate::exec::{
    LineSink, LocalExecutor, ProcessInvocation, ProcessRunner, RunControl, RunTermination,
};
use crate::interpreter::{default_tools_dir, normalize_extension, InterpreterResolver};
use crate::remote::{
    language_id_for_extension, CompileJob, RemoteCompiler, RemoteExecutionClient, ShortLinkResult,
};
use crate::types::{ExecutionRequest, ExecutionResult, HostOs};

pub const REMOTE_CANCELLED_MESSAGE: &str = "remote request was cancelled";

/// What the user has picked in the session, and the defaults derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub interpreter: Option<String>,
    pub compiler: Option<String>,
    /// Remote language id override. Cleared when the compiler changes.
    pub language: Option<String>,
    pub flags: String,
    /// Whether the output view should expect assembly.
    pub highlight_assembly: bool,
}

/// Observable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub is_running: bool,
    pub stdout: String,
    pub stderr: String,
    pub assembly: Option<String>,
    pub error_message: Option<String>,
    pub short_link: Option<String>,
    pub selection: Selection,
}

impl SessionSnapshot {
    fn clear_output(&mut self) {
        self.stdout.clear();
        self.stderr.clear();
        self.assembly = None;
        self.error_message = None;
        self.short_link = None;
    }
}

#[derive(Debug, Default)]
struct SessionState {
    snapshot: SessionSnapshot,
    handle: Option<RunningProcessHandle>,
}

type SharedState = Arc<Mutex<SessionState>>;

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `is_running` and the handle however the run ends, including when
/// the run future is dropped.
struct RunGuard {
    state: SharedState,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.snapshot.is_running = false;
        state.handle = None;
    }
}

/// Streaming sink that appends to the session and forwards to an observer.
///
/// Closed once the run has a terminal outcome, so lines from drain tasks that
/// outlive a kill are dropped.
struct SessionSink {
    state: SharedState,
    observer: Option<Arc<dyn LineSink>>,
    open: AtomicBool,
}

impl SessionSink {
    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl LineSink for SessionSink {
    fn on_stdout(&self, line: String) {
        if !self.open.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut state = lock(&self.state);
            state.snapshot.stdout.push_str(&line);
            state.snapshot.stdout.push('\n');
        }
        if let Some(observer) = &self.observer {
            observer.on_stdout(line);
        }
    }

    fn on_stderr(&self, line: String) {
        if !self.open.load(Ordering::SeqCst) {
            return;
        }
        let line = strip_ansi(&line).into_owned();
        {
            let mut state = lock(&self.state);
            state.snapshot.stderr.push_str(&line);
            state.snapshot.stderr.push('\n');
        }
        if let Some(observer) = &self.observer {
            observer.on_stderr(line);
        }
    }
}

/// Per-session front door for running snippets.
///
/// At most one run (local, remote or share) is in flight at a time; further
/// calls are rejected with [`ExecError::AlreadyRunning`]. All methods take
/// `&self`, so share the orchestrator behind an `Arc` to call
/// [`kill`](Self::kill) while a run is awaited elsewhere.
pub struct ExecutionOrchestrator<L: LocalExecutor, R: RemoteCompiler> {
    resolver: InterpreterResolver,
    compilers: CompilerCatalog,
    runner: RunnerSection,
    local: L,
    remote: R,
    observer: Option<Arc<dyn LineSink>>,
    state: SharedState,
}

impl ExecutionOrchestrator<ProcessRunner, RemoteExecutionClient> {
    /// Production wiring: real process runner and HTTP client.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let tools_dir = cfg.runner.tools_dir.clone().or_else(default_tools_dir);
        let resolver =
            InterpreterResolver::new(cfg.interpreters.clone(), HostOs::current(), tools_dir);
        let remote = RemoteExecutionClient::from_config(&cfg.remote)?;
        Ok(Self::new(
            resolver,
            cfg.compilers.clone(),
            cfg.runner.clone(),
            ProcessRunner::default(),
            remote,
        ))
    }
}

impl<L: LocalExecutor, R: RemoteCompiler> ExecutionOrchestrator<L, R> {
    pub fn new(
        resolver: InterpreterResolver,
        compilers: CompilerCatalog,
        runner: RunnerSection,
        local: L,
        remote: R,
    ) -> Self {
        Self {
            resolver,
            compilers,
            runner,
            local,
            remote,
            observer: None,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Receive live lines of streaming local runs.
    pub fn with_observer(mut self, observer: Arc<dyn LineSink>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn resolver(&self) -> &InterpreterResolver {
        &self.resolver
    }

    pub fn compilers(&self) -> &CompilerCatalog {
        &self.compilers
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.state).snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).snapshot.is_running
    }

    /// Pid of the running local process, once it has been spawned.
    pub fn running_pid(&self) -> Option<u32> {
        lock(&self.state).handle.as_ref().and_then(|h| h.pid())
    }

    /// Stop the in-flight run. Returns false if nothing was running or it had
    /// already been asked to stop.
    pub fn kill(&self) -> bool {
        let mut state = lock(&self.state);
        match state.handle.as_mut() {
            Some(handle) => handle.kill(),
            None => {
                debug!("kill ignored: nothing running");
                false
            }
        }
    }

    /// Same as [`kill`](Self::kill).
    pub fn cancel(&self) -> bool {
        self.kill()
    }

    /// Switch the local interpreter. Flags and the assembly hint reset;
    /// displayed output is left alone.
    pub fn select_interpreter(&self, extension: &str) {
        let extension = normalize_extension(extension);
        let mut state = lock(&self.state);
        let selection = &mut state.snapshot.selection;
        selection.interpreter = Some(extension);
        selection.flags.clear();
        selection.highlight_assembly = false;
    }

    /// Switch the remote compiler and take its default flags and assembly
    /// support from the catalog. Unknown ids get empty defaults.
    pub fn select_compiler(&self, compiler_id: &str) {
        let compiler_id = compiler_id.trim().to_string();
        let profile = self.compilers.get(&compiler_id);
        if profile.is_none() {
            debug!(compiler = %compiler_id, "selected compiler is not in the catalog");
        }

        let mut state = lock(&self.state);
        let selection = &mut state.snapshot.selection;
        selection.flags = profile.map(|p| p.default_flags.clone()).unwrap_or_default();
        selection.highlight_assembly = profile.is_some_and(|p| p.supports_assembly);
        selection.language = None;
        selection.compiler = Some(compiler_id);
    }

    /// Send `language` instead of the catalog or extension-derived id.
    pub fn set_language(&self, language: Option<String>) {
        lock(&self.state).snapshot.selection.language =
            language.filter(|l| !l.trim().is_empty());
    }

    /// Replace the session's flags without changing the selection.
    pub fn set_flags(&self, flags: impl Into<String>) {
        lock(&self.state).snapshot.selection.flags = flags.into();
    }

    /// Run the snippet with a local interpreter.
    ///
    /// `target_id`, when set, picks the interpreter by key instead of the
    /// extension.
    pub async fn run_local(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let (_guard, cancel_rx, pid_slot) = self.begin_run()?;

        let key = request
            .target_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(&request.language_extension);

        let Some(interpreter) = self.resolver.resolve(key) else {
            let message = format!(
                "no interpreter is registered for extension '{}'",
                normalize_extension(key)
            );
            warn!(extension = %key, "no interpreter for snippet");
            return Ok(self.finish(ExecutionResult::failure(message)));
        };

        let invocation = ProcessInvocation::new(&interpreter.program, self.runner.timeout)
            .args(request.user_flags.split_whitespace())
            .args(interpreter.default_args.iter().cloned())
            .stdin(request.source_text);
        let program = invocation.display_name();
        let control = RunControl::new(cancel_rx).with_pid_slot(pid_slot);

        info!(
            program = %program,
            extension = %interpreter.extension,
            bundled = interpreter.bundled,
            streaming = self.runner.stream_output,
            "starting local run"
        );

        // The live session text is per line; the final result takes the
        // executor's exact output so both modes publish the same text.
        let output = if self.runner.stream_output {
            let sink = Arc::new(SessionSink {
                state: Arc::clone(&self.state),
                observer: self.observer.clone(),
                open: AtomicBool::new(true),
            });
            let output = self
                .local
                .run_streaming(invocation, control, Arc::clone(&sink) as Arc<dyn LineSink>)
                .await;
            sink.close();
            output
        } else {
            self.local.run_buffered(invocation, control).await
        };
        let result = local_result(&program, output.termination, output.stdout, output.stderr);

        Ok(self.finish(result))
    }

    /// Compile and run the snippet on the remote service.
    ///
    /// The compiler is `target_id` or else the selected compiler.
    pub async fn run_remote(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let (_guard, cancel_rx, _pid) = self.begin_run()?;

        let job = match self.compile_job(request) {
            Ok(job) => job,
            Err(message) => return Ok(self.finish(ExecutionResult::failure(message))),
        };
        let compiler = job.compiler_id.clone();

        let result = tokio::select! {
            result = self.remote.compile_and_run(job) => result,
            _ = cancelled(cancel_rx) => {
                info!(compiler = %compiler, "remote request cancelled");
                ExecutionResult::failure(REMOTE_CANCELLED_MESSAGE)
            }
        };

        Ok(self.finish(result))
    }

    /// Produce a short link for the snippet and compiler.
    pub async fn share(&self, request: ExecutionRequest) -> Result<ShortLinkResult> {
        let (_guard, cancel_rx, _pid) = self.begin_run()?;

        let link = match self.compile_job(request) {
            Ok(job) => {
                let compiler = job.compiler_id.clone();
                tokio::select! {
                    link = self.remote.compile_and_shorten(job) => link,
                    _ = cancelled(cancel_rx) => {
                        info!(compiler = %compiler, "share request cancelled");
                        ShortLinkResult::failure(REMOTE_CANCELLED_MESSAGE)
                    }
                }
            }
            Err(message) => ShortLinkResult::failure(message),
        };

        let mut state = lock(&self.state);
        match &link.error {
            None => state.snapshot.short_link = Some(link.url.clone()),
            Some(message) => state.snapshot.error_message = Some(message.clone()),
        }
        Ok(link)
    }

    fn begin_run(
        &self,
    ) -> Result<(RunGuard, oneshot::Receiver<()>, Arc<std::sync::OnceLock<u32>>)> {
        let mut state = lock(&self.state);
        if state.snapshot.is_running {
            debug!("run rejected: another run is in progress");
            return Err(ExecError::AlreadyRunning);
        }

        let (handle, cancel_rx, pid_slot) = RunningProcessHandle::start();
        state.snapshot.is_running = true;
        state.snapshot.clear_output();
        state.handle = Some(handle);

        let guard = RunGuard {
            state: Arc::clone(&self.state),
        };
        Ok((guard, cancel_rx, pid_slot))
    }

    /// Strip escapes from stderr and publish the result to the session.
    fn finish(&self, mut result: ExecutionResult) -> ExecutionResult {
        result.stderr = strip_ansi(&result.stderr).into_owned();

        let mut state = lock(&self.state);
        let snapshot = &mut state.snapshot;
        snapshot.stdout = result.stdout.clone();
        snapshot.stderr = result.stderr.clone();
        snapshot.assembly = result.assembly.clone();
        snapshot.error_message = result.error_message.clone();
        result
    }

    fn compile_job(&self, request: ExecutionRequest) -> std::result::Result<CompileJob, String> {
        let (selected, language) = {
            let state = lock(&self.state);
            let selection = &state.snapshot.selection;
            (selection.compiler.clone(), selection.language.clone())
        };
        let compiler_id = request
            .target_id
            .filter(|id| !id.trim().is_empty())
            .or(selected)
            .map(|id| id.trim().to_string())
            .ok_or_else(|| "no remote compiler is selected".to_string())?;

        let language_id = language
            .or_else(|| self.compilers.get(&compiler_id).map(|p| p.language.clone()))
            .unwrap_or_else(|| language_id_for_extension(&request.language_extension));

        Ok(CompileJob {
            source: request.source_text,
            compiler_id,
            language_id,
            user_flags: request.user_flags,
            want_assembly: request.want_assembly,
        })
    }
}

/// Aborted runs keep no output; other failures keep what was printed.
fn local_result(
    program: &str,
    termination: RunTermination,
    stdout: String,
    stderr: String,
) -> ExecutionResult {
    let succeeded = termination.succeeded();
    let error_message = termination.message(program);

    match termination {
        RunTermination::TimedOut { .. } | RunTermination::Killed { .. } => ExecutionResult {
            stdout: String::new(),
            stderr: String::new(),
            assembly: None,
            error_message,
            succeeded: false,
        },
        _ => ExecutionResult {
            stdout,
            stderr,
            assembly: None,
            error_message,
            succeeded,
        },
    }
}

/// Resolves on kill; pends forever if the handle was dropped without one.
async fn cancelled(cancel_rx: oneshot::Receiver<()>) {
    if cancel_rx.await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_runs_drop_output() {
        let result = local_result(
            "python3",
            RunTermination::Killed {
                message: "process 'python3' was killed by user request".into(),
            },
            "partial".into(),
            "noise".into(),
        );
        assert!(result.stdout.is_empty());
        assert!(result.stderr.is_empty());
        assert!(!result.succeeded);
        assert_eq!(
            result.error_message.as_deref(),
            Some("process 'python3' was killed by user request")
        );
    }

    #[test]
    fn nonzero_exit_keeps_output() {
        let result = local_result(
            "node",
            RunTermination::Completed { exit_code: Some(3) },
            "out\n".into(),
            "err\n".into(),
        );
        assert_eq!(result.stdout, "out\n");
        assert!(!result.succeeded);
        assert_eq!(
            result.error_message.as_deref(),
            Some("process 'node' exited with code 3")
        );
    }

    #[test]
    fn clean_exit_has_no_message() {
        let result = local_result(
            "sh",
            RunTermination::Completed { exit_code: Some(0) },
            "ok\n".into(),
            String::new(),
        );
        assert!(result.succeeded);
        assert_eq!(result.error_message, None);
    }
}
