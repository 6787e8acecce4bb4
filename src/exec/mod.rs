// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running interpreter processes,
//! using `tokio::process::Command`, and reporting how each run ended.
//!
//! - [`runner`] spawns the child with redirected stdio, in buffered or
//!   streaming mode, and owns the timeout / kill race.
//! - [`terminate`] hides the platform mechanism for killing a whole process
//!   tree behind [`ProcessTreeTerminator`].
//! - [`barrier`] is the two-permit countdown that streaming mode waits on
//!   before treating a run as finished.
//! - [`state`] holds the run state machine and terminal outcomes.
//! - [`sink`] defines the per-line callbacks for streaming mode.
//! - [`backend`] provides the `LocalExecutor` trait the orchestrator uses, so
//!   tests can replace the real runner with a fake.

pub mod backend;
pub mod barrier;
pub mod runner;
pub mod sink;
pub mod state;
pub mod terminate;

pub use backend::LocalExecutor;
pub use barrier::StreamBarrier;
pub use runner::{ProcessInvocation, ProcessOutput, ProcessRunner, RunControl};
pub use sink::{CollectingSink, FnSink, LineSink};
pub use state::{RunState, RunTermination};
pub use terminate::{platform_terminator, ProcessTreeTerminator};
