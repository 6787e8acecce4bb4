#![cfg(unix)]

mod common;
use crate::common::{init_tracing, sh, with_timeout};

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use snipexec::exec::{
    platform_terminator, CollectingSink, ProcessInvocation, ProcessRunner, RunControl,
    RunTermination,
};

#[tokio::test]
async fn buffered_run_captures_both_streams() {
    init_tracing();
    let runner = ProcessRunner::default();
    let inv = sh("echo out\necho err 1>&2\n", Duration::from_secs(5));

    let output = with_timeout(runner.run_buffered(&inv, RunControl::uncancellable())).await;

    assert_eq!(output.termination, RunTermination::Completed { exit_code: Some(0) });
    assert!(output.succeeded());
    assert_eq!(output.stdout, "out\n");
    assert_eq!(output.stderr, "err\n");
}

#[tokio::test]
async fn streaming_preserves_line_order_per_stream() {
    init_tracing();
    let runner = ProcessRunner::default();
    let inv = sh(
        "for i in 1 2 3 4 5; do echo $i; echo e$i 1>&2; done\n",
        Duration::from_secs(5),
    );
    let sink = CollectingSink::new();

    let output = with_timeout(runner.run_streaming(
        &inv,
        RunControl::uncancellable(),
        Arc::new(sink.clone()),
    ))
    .await;

    assert!(output.succeeded());
    assert_eq!(sink.stdout_lines(), vec!["1", "2", "3", "4", "5"]);
    assert_eq!(sink.stderr_lines(), vec!["e1", "e2", "e3", "e4", "e5"]);
}

#[tokio::test]
async fn buffered_and_streaming_report_the_same_output() {
    init_tracing();
    let runner = ProcessRunner::default();
    let script = "echo alpha\nprintf 'gamma\\r\\n'\necho oops 1>&2\nprintf 'no newline'\n";

    let buffered = with_timeout(runner.run_buffered(
        &sh(script, Duration::from_secs(5)),
        RunControl::uncancellable(),
    ))
    .await;

    let sink = CollectingSink::new();
    let streamed = with_timeout(runner.run_streaming(
        &sh(script, Duration::from_secs(5)),
        RunControl::uncancellable(),
        Arc::new(sink.clone()),
    ))
    .await;

    assert_eq!(buffered, streamed);
    assert_eq!(streamed.stdout, "alpha\ngamma\r\nno newline");
    assert_eq!(streamed.stderr, "oops\n");
    // Sink lines carry no terminators.
    assert_eq!(sink.stdout_lines(), vec!["alpha", "gamma", "no newline"]);
}

#[tokio::test]
async fn nonzero_exit_is_a_failure() {
    init_tracing();
    let runner = ProcessRunner::default();
    let output = with_timeout(runner.run_buffered(
        &sh("echo partial\nexit 3\n", Duration::from_secs(5)),
        RunControl::uncancellable(),
    ))
    .await;

    assert_eq!(output.termination, RunTermination::Completed { exit_code: Some(3) });
    assert!(!output.succeeded());
    assert_eq!(output.stdout, "partial\n");
}

#[tokio::test]
async fn buffered_timeout_discards_output() {
    init_tracing();
    let runner = ProcessRunner::default();
    let inv = sh("echo early\nsleep 30\n", Duration::from_millis(300));

    let started = Instant::now();
    let output = with_timeout(runner.run_buffered(&inv, RunControl::uncancellable())).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    match &output.termination {
        RunTermination::TimedOut { message } => {
            assert!(message.contains("timed out"), "{message}");
            assert!(message.contains("'sh'"), "{message}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

/// The grandchild (`sleep`) must die with its parent shell.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn streaming_timeout_kills_the_whole_tree() {
    init_tracing();
    let runner = ProcessRunner::default();
    let inv = sh("sleep 30 &\necho $!\nwait\n", Duration::from_millis(500));
    let sink = CollectingSink::new();

    let output = with_timeout(runner.run_streaming(
        &inv,
        RunControl::uncancellable(),
        Arc::new(sink.clone()),
    ))
    .await;

    let termination = output.termination;
    assert!(matches!(termination, RunTermination::TimedOut { .. }), "{termination:?}");
    assert!(output.stdout.is_empty());
    let stderr = sink.stderr_lines();
    let last = stderr.last().expect("synthetic timeout line");
    assert!(last.contains("timed out"), "{last}");

    let grandchild: u32 = sink.stdout_lines()[0].trim().parse().unwrap();
    with_timeout(async {
        while process_is_live(grandchild) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
}

/// False once the process is gone or is a zombie nobody has reaped yet.
#[cfg(target_os = "linux")]
fn process_is_live(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => {
            // State is the first field after the parenthesised command name.
            let state = stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .unwrap_or("");
            state != "Z" && state != "X"
        }
        Err(_) => false,
    }
}

#[tokio::test]
async fn kill_request_stops_the_run() {
    init_tracing();
    let runner = ProcessRunner::default();
    let (tx, rx) = oneshot::channel();
    let pid_slot = Arc::new(OnceLock::new());
    let control = RunControl::new(rx).with_pid_slot(Arc::clone(&pid_slot));
    let inv = sh("sleep 30\n", Duration::from_secs(30));

    let sink = CollectingSink::new();
    let run = runner.run_streaming(&inv, control, Arc::new(sink.clone()));
    let killer = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(()).unwrap();
    };

    let started = Instant::now();
    let (output, ()) = with_timeout(async { tokio::join!(run, killer) }).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    match output.termination {
        RunTermination::Killed { message } => assert!(message.contains("killed"), "{message}"),
        other => panic!("expected kill, got {other:?}"),
    }
    assert!(pid_slot.get().is_some());
    assert!(sink.stderr_lines().is_empty());
}

#[tokio::test]
async fn terminating_an_exited_process_is_a_no_op() {
    init_tracing();
    let runner = ProcessRunner::default();
    let pid_slot = Arc::new(OnceLock::new());
    let control = RunControl::uncancellable().with_pid_slot(Arc::clone(&pid_slot));

    let output =
        with_timeout(runner.run_buffered(&sh("exit 0\n", Duration::from_secs(5)), control)).await;
    assert!(output.succeeded());

    let pid = *pid_slot.get().expect("pid recorded at spawn");
    let terminator = platform_terminator();
    terminator.terminate(pid).unwrap();
    terminator.terminate(pid).unwrap();
}

#[tokio::test]
async fn spawn_failure_reports_start_failed() {
    init_tracing();
    let runner = ProcessRunner::default();
    let pid_slot = Arc::new(OnceLock::new());
    let control = RunControl::uncancellable().with_pid_slot(Arc::clone(&pid_slot));
    let inv = ProcessInvocation::new("/definitely/not/an/interpreter", Duration::from_secs(1));

    let output = with_timeout(runner.run_buffered(&inv, control)).await;

    match &output.termination {
        RunTermination::StartFailed { message } => {
            assert!(message.starts_with("failed to start"), "{message}");
        }
        other => panic!("expected start failure, got {other:?}"),
    }
    assert!(pid_slot.get().is_none());
}

#[tokio::test]
async fn empty_stdin_still_closes_input() {
    init_tracing();
    let runner = ProcessRunner::default();
    // `cat` only exits once stdin reaches end-of-file.
    let inv = ProcessInvocation::new("cat", Duration::from_secs(5));

    let output = with_timeout(runner.run_buffered(&inv, RunControl::uncancellable())).await;

    assert_eq!(output.termination, RunTermination::Completed { exit_code: Some(0) });
    assert_eq!(output.stdout, "");
}

#[tokio::test]
async fn flags_are_passed_before_stdin_argument() {
    init_tracing();
    let runner = ProcessRunner::default();
    // -e makes the failing `false` abort the script before the echo.
    let inv = ProcessInvocation::new("sh", Duration::from_secs(5))
        .args(["-e", "-s"])
        .stdin("false\necho unreachable\n");

    let output = with_timeout(runner.run_buffered(&inv, RunControl::uncancellable())).await;

    assert_eq!(output.termination, RunTermination::Completed { exit_code: Some(1) });
    assert_eq!(output.stdout, "");
}
