// src/exec/runner.rs

//! Child process runner with redirected stdio, timeout and tree kill.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::ExecError;
use crate::exec::barrier::StreamBarrier;
use crate::exec::sink::LineSink;
use crate::exec::state::{RunState, RunTermination};
use crate::exec::terminate::{platform_terminator, ProcessTreeTerminator};

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Written in full, then stdin is closed. Empty text is never written.
    pub stdin_text: String,
    pub timeout: Duration,
}

impl ProcessInvocation {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_text: String::new(),
            timeout,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, text: impl Into<String>) -> Self {
        self.stdin_text = text.into();
        self
    }

    /// Program name used in log fields and user-facing messages.
    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }
}

/// Cancellation and pid reporting for one run.
#[derive(Debug)]
pub struct RunControl {
    cancel_rx: oneshot::Receiver<()>,
    pid_slot: Option<Arc<OnceLock<u32>>>,
}

impl RunControl {
    /// A send on the paired sender kills the run. Dropping the sender does not.
    pub fn new(cancel_rx: oneshot::Receiver<()>) -> Self {
        Self {
            cancel_rx,
            pid_slot: None,
        }
    }

    /// A control nobody can cancel; the run ends by exit or timeout.
    pub fn uncancellable() -> Self {
        let (_tx, rx) = oneshot::channel();
        Self::new(rx)
    }

    /// The runner stores the child's pid here right after spawn.
    pub fn with_pid_slot(mut self, slot: Arc<OnceLock<u32>>) -> Self {
        self.pid_slot = Some(slot);
        self
    }

    /// For executors other than [`ProcessRunner`].
    pub fn into_parts(self) -> (oneshot::Receiver<()>, Option<Arc<OnceLock<u32>>>) {
        (self.cancel_rx, self.pid_slot)
    }
}

/// Result of a run in either mode. On abort both output fields are empty.
///
/// Streaming mode rebuilds the fields from the raw bytes it read, so for the
/// same process both modes report identical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub termination: RunTermination,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    fn without_output(termination: RunTermination) -> Self {
        Self {
            termination,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.termination.succeeded()
    }
}

/// Spawns interpreter processes.
///
/// Both modes share spawn, stdin handling and the three-way race between
/// normal completion, the deadline and a user kill.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    terminator: Arc<dyn ProcessTreeTerminator>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(platform_terminator())
    }
}

enum Race<T> {
    Finished(T),
    Deadline,
    Cancelled,
}

struct Spawned {
    child: Child,
    pid: Option<u32>,
    stdout: ChildStdout,
    stderr: ChildStderr,
}

impl ProcessRunner {
    pub fn new(terminator: Arc<dyn ProcessTreeTerminator>) -> Self {
        Self { terminator }
    }

    /// Run to completion and return everything the process printed.
    pub async fn run_buffered(
        &self,
        inv: &ProcessInvocation,
        control: RunControl,
    ) -> ProcessOutput {
        let program = inv.display_name();
        let mut state = RunState::NotStarted;
        let (cancel_rx, pid_slot) = control.into_parts();

        let Spawned {
            mut child,
            pid,
            stdout,
            stderr,
        } = match self.spawn(inv, &mut state, pid_slot.as_deref()) {
            Ok(spawned) => spawned,
            Err(termination) => return ProcessOutput::without_output(termination),
        };

        let out_task = tokio::spawn(read_all(stdout));
        let err_task = tokio::spawn(read_all(stderr));

        let race = tokio::select! {
            biased;
            done = async {
                let (out, err) = tokio::join!(out_task, err_task);
                let status = child.wait().await;
                (out.unwrap_or_default(), err.unwrap_or_default(), status)
            } => Race::Finished(done),
            _ = tokio::time::sleep(inv.timeout) => Race::Deadline,
            _ = cancelled(cancel_rx) => Race::Cancelled,
        };

        match race {
            Race::Finished((stdout, stderr, status)) => {
                let termination = completed(&program, &mut state, status);
                ProcessOutput {
                    termination,
                    stdout,
                    stderr,
                }
            }
            Race::Deadline => {
                let termination = self
                    .abort(&mut child, pid, &program, &mut state, inv, true)
                    .await;
                ProcessOutput::without_output(termination)
            }
            Race::Cancelled => {
                let termination = self
                    .abort(&mut child, pid, &program, &mut state, inv, false)
                    .await;
                ProcessOutput::without_output(termination)
            }
        }
    }

    /// Run while delivering each line to `sink` as it arrives.
    ///
    /// Normal completion needs both streams at end-of-file and the process
    /// exited. On timeout, one synthetic line carrying the timeout message is
    /// sent to [`LineSink::on_stderr`].
    pub async fn run_streaming(
        &self,
        inv: &ProcessInvocation,
        control: RunControl,
        sink: Arc<dyn LineSink>,
    ) -> ProcessOutput {
        let program = inv.display_name();
        let mut state = RunState::NotStarted;
        let (cancel_rx, pid_slot) = control.into_parts();

        let Spawned {
            mut child,
            pid,
            stdout,
            stderr,
        } = match self.spawn(inv, &mut state, pid_slot.as_deref()) {
            Ok(spawned) => spawned,
            Err(termination) => return ProcessOutput::without_output(termination),
        };

        let barrier = StreamBarrier::for_stdio();
        let out_task = tokio::spawn(drain_lines(
            stdout,
            Arc::clone(&sink),
            OutputStream::Stdout,
            barrier.clone(),
        ));
        let err_task = tokio::spawn(drain_lines(
            stderr,
            Arc::clone(&sink),
            OutputStream::Stderr,
            barrier.clone(),
        ));

        let race = tokio::select! {
            biased;
            status = async {
                barrier.wait().await;
                child.wait().await
            } => Race::Finished(status),
            _ = tokio::time::sleep(inv.timeout) => Race::Deadline,
            _ = cancelled(cancel_rx) => Race::Cancelled,
        };

        match race {
            Race::Finished(status) => {
                let termination = completed(&program, &mut state, status);
                // Both drains have passed the barrier, so these resolve at once.
                let (stdout, stderr) = tokio::join!(out_task, err_task);
                ProcessOutput {
                    termination,
                    stdout: stdout.unwrap_or_default(),
                    stderr: stderr.unwrap_or_default(),
                }
            }
            Race::Deadline => {
                let termination = self
                    .abort(&mut child, pid, &program, &mut state, inv, true)
                    .await;
                if let Some(message) = termination.message(&program) {
                    sink.on_stderr(message);
                }
                ProcessOutput::without_output(termination)
            }
            Race::Cancelled => {
                let termination = self
                    .abort(&mut child, pid, &program, &mut state, inv, false)
                    .await;
                ProcessOutput::without_output(termination)
            }
        }
    }

    fn spawn(
        &self,
        inv: &ProcessInvocation,
        state: &mut RunState,
        pid_slot: Option<&OnceLock<u32>>,
    ) -> Result<Spawned, RunTermination> {
        let program = inv.display_name();
        transition(&program, state, RunState::Starting);

        info!(
            program = %inv.program.display(),
            args = ?inv.args,
            timeout_ms = inv.timeout.as_millis() as u64,
            "starting process"
        );

        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        self.terminator.prepare(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                transition(&program, state, RunState::StartFailed);
                let error = ExecError::SpawnFailure {
                    program: inv.program.display().to_string(),
                    reason: err.to_string(),
                };
                warn!(program = %program, error = %error, "process failed to start");
                return Err(RunTermination::StartFailed {
                    message: error.to_string(),
                });
            }
        };

        let pid = child.id();
        if let (Some(slot), Some(pid)) = (pid_slot, pid) {
            let _ = slot.set(pid);
        }

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            // Both are piped above, so this only happens if tokio changes.
            transition(&program, state, RunState::StartFailed);
            return Err(RunTermination::StartFailed {
                message: format!("process '{program}' started without output pipes"),
            });
        };

        write_stdin(child.stdin.take(), inv.stdin_text.clone(), program.clone());
        transition(&program, state, RunState::Running);
        debug!(program = %program, pid = ?pid, "process running");

        Ok(Spawned {
            child,
            pid,
            stdout,
            stderr,
        })
    }

    /// Kill the whole tree and reap the direct child.
    async fn abort(
        &self,
        child: &mut Child,
        pid: Option<u32>,
        program: &str,
        state: &mut RunState,
        inv: &ProcessInvocation,
        timed_out: bool,
    ) -> RunTermination {
        if let Some(pid) = pid {
            if let Err(err) = self.terminator.terminate(pid) {
                warn!(program, pid, error = %err, "failed to terminate process tree");
            }
        }
        if let Err(err) = child.start_kill() {
            debug!(program, error = %err, "direct kill after tree termination failed");
        }
        if let Err(err) = child.wait().await {
            debug!(program, error = %err, "waiting for killed process failed");
        }

        if timed_out {
            transition(program, state, RunState::TimedOut);
            let error = ExecError::Timeout {
                program: program.to_string(),
                timeout_ms: inv.timeout.as_millis(),
            };
            warn!(program, pid = ?pid, "process timed out; tree terminated");
            RunTermination::TimedOut {
                message: error.to_string(),
            }
        } else {
            transition(program, state, RunState::Killed);
            let error = ExecError::UserKilled {
                program: program.to_string(),
            };
            info!(program, pid = ?pid, "process killed on request");
            RunTermination::Killed {
                message: error.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

fn completed(
    program: &str,
    state: &mut RunState,
    status: std::io::Result<ExitStatus>,
) -> RunTermination {
    transition(program, state, RunState::Completed);
    match status {
        Ok(status) => {
            let exit_code = status.code();
            info!(program, exit_code = ?exit_code, "process exited");
            RunTermination::Completed { exit_code }
        }
        Err(err) => {
            warn!(program, error = %err, "failed to collect exit status");
            let error = ExecError::WaitFailure {
                program: program.to_string(),
                reason: err.to_string(),
            };
            RunTermination::WaitFailed {
                message: error.to_string(),
            }
        }
    }
}

fn transition(program: &str, state: &mut RunState, next: RunState) {
    match state.advance(next) {
        Ok(new_state) => {
            debug!(program, from = %state, to = %new_state, "run state changed");
            *state = new_state;
        }
        Err(err) => warn!(program, error = %err, "ignoring run state change"),
    }
}

/// Resolves when a kill is requested; pends forever if the sender is dropped.
async fn cancelled(cancel_rx: oneshot::Receiver<()>) {
    if cancel_rx.await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn write_stdin(stdin: Option<ChildStdin>, text: String, program: String) {
    let Some(mut stdin) = stdin else {
        return;
    };
    if text.is_empty() {
        // Dropping the pipe closes it, so the child still sees EOF.
        return;
    }
    tokio::spawn(async move {
        if let Err(err) = stdin.write_all(text.as_bytes()).await {
            debug!(program = %program, error = %err, "stdin write failed");
        }
        if let Err(err) = stdin.shutdown().await {
            debug!(program = %program, error = %err, "stdin close failed");
        }
    });
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    if let Err(err) = reader.read_to_end(&mut buf).await {
        debug!(error = %err, "output stream read failed");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Delivers each line to `sink` and returns everything read, terminators
/// included, decoded the same way [`read_all`] decodes buffered output.
async fn drain_lines<R: AsyncRead + Unpin>(
    reader: R,
    sink: Arc<dyn LineSink>,
    stream: OutputStream,
    barrier: StreamBarrier,
) -> String {
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();

    loop {
        let start = raw.len();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let line = trim_line_ending(&raw[start..]);
                match stream {
                    OutputStream::Stdout => sink.on_stdout(line),
                    OutputStream::Stderr => sink.on_stderr(line),
                }
            }
            Err(err) => {
                debug!(?stream, error = %err, "output stream read failed");
                break;
            }
        }
    }

    barrier.arrive();
    String::from_utf8_lossy(&raw).into_owned()
}

fn trim_line_ending(buf: &[u8]) -> String {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && buf[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
