// src/interpreter/mod.rs

//! Local interpreter lookup.
//!
//! - [`registry`] holds the extension → per-OS executable table.
//! - [`resolver`] turns an extension into a program path for the host OS,
//!   preferring a copy in the bundled tools directory.

pub mod registry;
pub mod resolver;

pub use registry::{normalize_extension, InterpreterRegistry, InterpreterSpec};
pub use resolver::{default_tools_dir, InterpreterResolver, ResolvedInterpreter};
