// src/exec/backend.rs

//! Pluggable local executor abstraction.
//!
//! The orchestrator talks to a `LocalExecutor` instead of a concrete
//! [`ProcessRunner`]. Production wires in the runner; tests provide an
//! executor that records invocations and scripts outcomes without spawning
//! real processes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::exec::runner::{ProcessInvocation, ProcessOutput, ProcessRunner, RunControl};
use crate::exec::sink::LineSink;

/// Trait abstracting how a local process run is carried out.
pub trait LocalExecutor: Send + Sync {
    /// Buffered mode: wait for the run to finish, return the full output.
    fn run_buffered(
        &self,
        invocation: ProcessInvocation,
        control: RunControl,
    ) -> Pin<Box<dyn Future<Output = ProcessOutput> + Send + '_>>;

    /// Streaming mode: deliver lines to `sink` while the run is in progress.
    /// The returned output matches what buffered mode would report.
    fn run_streaming(
        &self,
        invocation: ProcessInvocation,
        control: RunControl,
        sink: Arc<dyn LineSink>,
    ) -> Pin<Box<dyn Future<Output = ProcessOutput> + Send + '_>>;
}

impl LocalExecutor for ProcessRunner {
    fn run_buffered(
        &self,
        invocation: ProcessInvocation,
        control: RunControl,
    ) -> Pin<Box<dyn Future<Output = ProcessOutput> + Send + '_>> {
        Box::pin(async move { ProcessRunner::run_buffered(self, &invocation, control).await })
    }

    fn run_streaming(
        &self,
        invocation: ProcessInvocation,
        control: RunControl,
        sink: Arc<dyn LineSink>,
    ) -> Pin<Box<dyn Future<Output = ProcessOutput> + Send + '_>> {
        Box::pin(async move {
            ProcessRunner::run_streaming(self, &invocation, control, sink).await
        })
    }
}
