// src/remote/payload.rs

//! Request bodies for the compile and shortener endpoints.

use serde::Serialize;

/// One compile-and-run job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    pub source: String,
    pub compiler_id: String,
    pub language_id: String,
    pub user_flags: String,
    pub want_assembly: bool,
}

/// `POST /api/compiler/{id}/compile` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest<'a> {
    pub source: &'a str,
    pub lang: &'a str,
    pub allow_store_code_debug: bool,
    pub options: CompileOptions<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions<'a> {
    pub user_arguments: &'a str,
    pub compiler_options: CompilerToggles,
    pub filters: AsmFilters,
}

/// `skipAsm` and `executorRequest` are both `!want_assembly`.
///
/// Asking for assembly sends a plain compile with `filters.execute`, so the
/// server compiles, lists assembly and runs, nesting the run under
/// `execResult`. Not asking sends an executor request, which only builds and
/// runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerToggles {
    pub skip_asm: bool,
    pub executor_request: bool,
}

impl CompilerToggles {
    pub fn for_assembly(want_assembly: bool) -> Self {
        Self {
            skip_asm: !want_assembly,
            executor_request: !want_assembly,
        }
    }
}

/// Fixed assembly formatting: Intel syntax, demangled, labels and comments
/// filtered, execution on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsmFilters {
    pub binary: bool,
    pub binary_object: bool,
    pub comment_only: bool,
    pub demangle: bool,
    pub directives: bool,
    pub execute: bool,
    pub intel: bool,
    pub labels: bool,
    pub library_code: bool,
    pub trim: bool,
    pub debug_calls: bool,
}

impl Default for AsmFilters {
    fn default() -> Self {
        Self {
            binary: false,
            binary_object: false,
            comment_only: true,
            demangle: true,
            directives: true,
            execute: true,
            intel: true,
            labels: true,
            library_code: false,
            trim: false,
            debug_calls: false,
        }
    }
}

impl<'a> CompileRequest<'a> {
    pub fn from_job(job: &'a CompileJob) -> Self {
        Self {
            source: &job.source,
            lang: &job.language_id,
            allow_store_code_debug: true,
            options: CompileOptions {
                user_arguments: &job.user_flags,
                compiler_options: CompilerToggles::for_assembly(job.want_assembly),
                filters: AsmFilters::default(),
            },
        }
    }
}

/// `POST /api/shortener` body: a single editor session with one compiler.
#[derive(Debug, Clone, Serialize)]
pub struct ShortenerRequest<'a> {
    pub sessions: Vec<ShortenerSession<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortenerSession<'a> {
    pub id: u32,
    pub language: &'a str,
    pub source: &'a str,
    pub compilers: Vec<ShortenerCompiler<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortenerCompiler<'a> {
    pub id: &'a str,
    pub options: &'a str,
}

impl<'a> ShortenerRequest<'a> {
    pub fn single(
        language: &'a str,
        source: &'a str,
        compiler_id: &'a str,
        flags: &'a str,
    ) -> Self {
        Self {
            sessions: vec![ShortenerSession {
                id: 1,
                language,
                source,
                compilers: vec![ShortenerCompiler {
                    id: compiler_id,
                    options: flags,
                }],
            }],
        }
    }
}
