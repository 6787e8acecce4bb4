// src/remote/mod.rs

//! Remote compile-and-execute support.
//!
//! - [`payload`] holds the request bodies.
//! - [`envelope`] parses and classifies responses.
//! - [`client`] is the HTTP client itself.
//!
//! The orchestrator only sees the [`RemoteCompiler`] trait, so tests can swap
//! in a scripted backend.

pub mod client;
pub mod envelope;
pub mod payload;

use std::future::Future;
use std::pin::Pin;

pub use client::{RemoteExecutionClient, ShortLinkResult};
pub use envelope::{RemoteResponseEnvelope, RUNTIME_STDERR_LABEL};
pub use payload::CompileJob;

use crate::types::ExecutionResult;

/// Backend seam for the remote path.
pub trait RemoteCompiler: Send + Sync {
    fn compile_and_run(
        &self,
        job: CompileJob,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>>;

    /// `job.want_assembly` is ignored.
    fn compile_and_shorten(
        &self,
        job: CompileJob,
    ) -> Pin<Box<dyn Future<Output = ShortLinkResult> + Send + '_>>;
}

impl RemoteCompiler for RemoteExecutionClient {
    fn compile_and_run(
        &self,
        job: CompileJob,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>> {
        Box::pin(async move { RemoteExecutionClient::compile_and_run(self, &job).await })
    }

    fn compile_and_shorten(
        &self,
        job: CompileJob,
    ) -> Pin<Box<dyn Future<Output = ShortLinkResult> + Send + '_>> {
        Box::pin(async move {
            RemoteExecutionClient::compile_and_shorten(
                self,
                &job.language_id,
                &job.source,
                &job.compiler_id,
                &job.user_flags,
            )
            .await
        })
    }
}

/// Compiler Explorer language id for a file extension.
///
/// Unknown extensions are passed through lowercased.
pub fn language_id_for_extension(extension: &str) -> String {
    let ext = crate::interpreter::normalize_extension(extension);
    let id = match ext.as_str() {
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => "c++",
        "rs" => "rust",
        "go" => "go",
        "zig" => "zig",
        "d" => "d",
        "swift" => "swift",
        "kt" => "kotlin",
        "java" => "java",
        "cs" => "csharp",
        "fs" => "fsharp",
        "hs" => "haskell",
        "ml" => "ocaml",
        "nim" => "nim",
        "pas" => "pascal",
        "f90" | "f95" | "f" => "fortran",
        "py" => "python",
        "ts" => "typescript",
        "js" => "javascript",
        "s" | "asm" => "assembly",
        other => other,
    };
    id.to_string()
}
