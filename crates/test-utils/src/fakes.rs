use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use snipexec::errors::ExecError;
use snipexec::exec::{
    LineSink, LocalExecutor, ProcessInvocation, ProcessOutput, RunControl, RunTermination,
};
use snipexec::remote::{CompileJob, RemoteCompiler, ShortLinkResult};
use snipexec::types::ExecutionResult;

/// Pid reported by [`FakeLocalExecutor`] for scripted runs.
pub const FAKE_PID: u32 = 4242;

/// What a fake local run does.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Print the lines, then exit with `code`.
    Exit {
        stdout: Vec<String>,
        stderr: Vec<String>,
        code: i32,
    },
    /// Print the lines, then wait until killed or the invocation times out.
    Hang { stdout: Vec<String> },
    /// Fail before a process exists.
    StartFailure(String),
}

impl FakeOutcome {
    pub fn exit(stdout: &[&str], stderr: &[&str], code: i32) -> Self {
        FakeOutcome::Exit {
            stdout: stdout.iter().map(|s| s.to_string()).collect(),
            stderr: stderr.iter().map(|s| s.to_string()).collect(),
            code,
        }
    }

    pub fn hang(stdout: &[&str]) -> Self {
        FakeOutcome::Hang {
            stdout: stdout.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A fake local executor that:
/// - records every invocation it receives
/// - plays back a scripted [`FakeOutcome`]
/// - signals `started` once a run is under way.
#[derive(Clone)]
pub struct FakeLocalExecutor {
    outcome: Arc<Mutex<FakeOutcome>>,
    invocations: Arc<Mutex<Vec<ProcessInvocation>>>,
    started: Arc<Notify>,
}

impl FakeLocalExecutor {
    pub fn new(outcome: FakeOutcome) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(outcome)),
            invocations: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(Notify::new()),
        }
    }

    pub fn set_outcome(&self, outcome: FakeOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn invocations(&self) -> Vec<ProcessInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Resolves once a run has started (immediately if one already did).
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    fn begin(&self, invocation: ProcessInvocation) -> FakeOutcome {
        self.invocations.lock().unwrap().push(invocation);
        self.outcome.lock().unwrap().clone()
    }

    async fn play(
        &self,
        invocation: &ProcessInvocation,
        control: RunControl,
        sink: &dyn LineSink,
    ) -> RunTermination {
        let program = invocation.display_name();
        let (cancel_rx, pid_slot) = control.into_parts();

        match self.begin(invocation.clone()) {
            FakeOutcome::StartFailure(reason) => {
                self.started.notify_one();
                RunTermination::StartFailed {
                    message: ExecError::SpawnFailure { program, reason }.to_string(),
                }
            }
            FakeOutcome::Exit { stdout, stderr, code } => {
                if let Some(slot) = pid_slot {
                    let _ = slot.set(FAKE_PID);
                }
                self.started.notify_one();
                for line in stdout {
                    sink.on_stdout(line);
                }
                for line in stderr {
                    sink.on_stderr(line);
                }
                RunTermination::Completed {
                    exit_code: Some(code),
                }
            }
            FakeOutcome::Hang { stdout } => {
                if let Some(slot) = pid_slot {
                    let _ = slot.set(FAKE_PID);
                }
                for line in stdout {
                    sink.on_stdout(line);
                }
                self.started.notify_one();
                tokio::select! {
                    res = cancel_rx => match res {
                        Ok(()) => RunTermination::Killed {
                            message: ExecError::UserKilled { program }.to_string(),
                        },
                        Err(_) => std::future::pending().await,
                    },
                    _ = tokio::time::sleep(invocation.timeout) => {
                        let message = ExecError::Timeout {
                            program,
                            timeout_ms: invocation.timeout.as_millis(),
                        }
                        .to_string();
                        sink.on_stderr(message.clone());
                        RunTermination::TimedOut { message }
                    }
                }
            }
        }
    }
}

/// Gathers the scripted lines as newline-terminated text, optionally
/// passing each line on to a live sink.
#[derive(Default)]
struct BufferSink {
    forward: Option<Arc<dyn LineSink>>,
    stdout: Mutex<String>,
    stderr: Mutex<String>,
}

impl BufferSink {
    fn forwarding(sink: Arc<dyn LineSink>) -> Self {
        Self {
            forward: Some(sink),
            ..Self::default()
        }
    }

    fn into_output(self, termination: RunTermination) -> ProcessOutput {
        let aborted = matches!(
            termination,
            RunTermination::TimedOut { .. } | RunTermination::Killed { .. }
        );
        if aborted {
            ProcessOutput {
                termination,
                stdout: String::new(),
                stderr: String::new(),
            }
        } else {
            ProcessOutput {
                termination,
                stdout: self.stdout.into_inner().unwrap(),
                stderr: self.stderr.into_inner().unwrap(),
            }
        }
    }
}

impl LineSink for BufferSink {
    fn on_stdout(&self, line: String) {
        {
            let mut out = self.stdout.lock().unwrap();
            out.push_str(&line);
            out.push('\n');
        }
        if let Some(forward) = &self.forward {
            forward.on_stdout(line);
        }
    }

    fn on_stderr(&self, line: String) {
        {
            let mut err = self.stderr.lock().unwrap();
            err.push_str(&line);
            err.push('\n');
        }
        if let Some(forward) = &self.forward {
            forward.on_stderr(line);
        }
    }
}

impl LocalExecutor for FakeLocalExecutor {
    fn run_buffered(
        &self,
        invocation: ProcessInvocation,
        control: RunControl,
    ) -> Pin<Box<dyn Future<Output = ProcessOutput> + Send + '_>> {
        Box::pin(async move {
            let sink = BufferSink::default();
            let termination = self.play(&invocation, control, &sink).await;
            sink.into_output(termination)
        })
    }

    fn run_streaming(
        &self,
        invocation: ProcessInvocation,
        control: RunControl,
        sink: Arc<dyn LineSink>,
    ) -> Pin<Box<dyn Future<Output = ProcessOutput> + Send + '_>> {
        Box::pin(async move {
            let sink = BufferSink::forwarding(sink);
            let termination = self.play(&invocation, control, &sink).await;
            sink.into_output(termination)
        })
    }
}

/// A fake remote compiler that records jobs and answers with a scripted
/// result. With `hang` set it never answers, so only a cancel ends the call.
#[derive(Clone)]
pub struct FakeRemoteCompiler {
    result: Arc<Mutex<ExecutionResult>>,
    link: Arc<Mutex<ShortLinkResult>>,
    jobs: Arc<Mutex<Vec<CompileJob>>>,
    hang: bool,
    started: Arc<Notify>,
}

impl FakeRemoteCompiler {
    pub fn new(result: ExecutionResult) -> Self {
        Self {
            result: Arc::new(Mutex::new(result)),
            link: Arc::new(Mutex::new(ShortLinkResult {
                url: "https://godbolt.org/z/fake".to_string(),
                error: None,
            })),
            jobs: Arc::new(Mutex::new(Vec::new())),
            hang: false,
            started: Arc::new(Notify::new()),
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(ExecutionResult::default())
        }
    }

    pub fn with_link(self, link: ShortLinkResult) -> Self {
        *self.link.lock().unwrap() = link;
        self
    }

    pub fn jobs(&self) -> Vec<CompileJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    async fn record(&self, job: CompileJob) {
        self.jobs.lock().unwrap().push(job);
        self.started.notify_one();
        if self.hang {
            std::future::pending::<()>().await;
        }
    }
}

impl RemoteCompiler for FakeRemoteCompiler {
    fn compile_and_run(
        &self,
        job: CompileJob,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>> {
        Box::pin(async move {
            self.record(job).await;
            self.result.lock().unwrap().clone()
        })
    }

    fn compile_and_shorten(
        &self,
        job: CompileJob,
    ) -> Pin<Box<dyn Future<Output = ShortLinkResult> + Send + '_>> {
        Box::pin(async move {
            self.record(job).await;
            self.link.lock().unwrap().clone()
        })
    }
}
