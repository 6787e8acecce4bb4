// src/exec/sink.rs

//! Per-line output callbacks for streaming runs.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Receives output lines as they arrive.
///
/// The two methods are called from independent drain tasks, so calls for
/// different streams can interleave arbitrarily. Calls for one stream arrive
/// in order.
pub trait LineSink: Send + Sync {
    fn on_stdout(&self, line: String);
    fn on_stderr(&self, line: String);
}

/// Adapts a pair of closures into a [`LineSink`].
pub struct FnSink<O, E> {
    on_out: O,
    on_err: E,
}

impl<O, E> FnSink<O, E>
where
    O: Fn(String) + Send + Sync,
    E: Fn(String) + Send + Sync,
{
    pub fn new(on_out: O, on_err: E) -> Self {
        Self { on_out, on_err }
    }
}

impl<O, E> LineSink for FnSink<O, E>
where
    O: Fn(String) + Send + Sync,
    E: Fn(String) + Send + Sync,
{
    fn on_stdout(&self, line: String) {
        (self.on_out)(line)
    }

    fn on_stderr(&self, line: String) {
        (self.on_err)(line)
    }
}

impl<O, E> fmt::Debug for FnSink<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}

/// Collects lines in memory. Handy for tests and for callers that want
/// streaming semantics with a buffered result.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    stdout: Arc<Mutex<Vec<String>>>,
    stderr: Arc<Mutex<Vec<String>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn stderr_lines(&self) -> Vec<String> {
        self.stderr.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl LineSink for CollectingSink {
    fn on_stdout(&self, line: String) {
        if let Ok(mut guard) = self.stdout.lock() {
            guard.push(line);
        }
    }

    fn on_stderr(&self, line: String) {
        if let Ok(mut guard) = self.stderr.lock() {
            guard.push(line);
        }
    }
}
