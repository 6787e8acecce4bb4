// src/engine/mod.rs

//! Session orchestration.
//!
//! [`ExecutionOrchestrator`] picks the local or remote path for a request,
//! owns the single in-flight [`RunningProcessHandle`], and publishes output
//! to an observable [`SessionSnapshot`]. [`ansi`] cleans stderr before it is
//! shown.

pub mod ansi;
pub mod handle;
pub mod orchestrator;

pub use ansi::strip_ansi;
pub use handle::RunningProcessHandle;
pub use orchestrator::{ExecutionOrchestrator, Selection, SessionSnapshot, REMOTE_CANCELLED_MESSAGE};
