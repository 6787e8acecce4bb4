// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `snipexec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "snipexec",
    version,
    about = "Run code snippets with a local interpreter or a remote compiler service.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `snipexec/config.toml` in the user config directory. A
    /// missing default file means built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SNIPEXEC_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a snippet with a local interpreter.
    Run(RunArgs),
    /// Compile and run a snippet on the remote service.
    Remote(RemoteArgs),
    /// Create a short link for a snippet on the remote service.
    Share(ShareArgs),
    /// Print the interpreter table resolved for this machine.
    Interpreters,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Snippet file. Its extension picks the interpreter.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Interpreter key to use instead of the file extension.
    #[arg(long, value_name = "EXT")]
    pub ext: Option<String>,

    /// Extra interpreter flags, placed before the default arguments.
    #[arg(long, value_name = "STR", allow_hyphen_values = true)]
    pub flags: Option<String>,

    /// Override `[runner].timeout`, e.g. `5s` or `500ms`.
    #[arg(long, value_name = "DUR")]
    pub timeout: Option<String>,

    /// Print output once the run ends instead of line by line.
    #[arg(long)]
    pub buffered: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RemoteArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Compiler id, e.g. `g132`.
    #[arg(long, value_name = "ID")]
    pub compiler: String,

    /// Language id. Default: from the compiler catalog or the file extension.
    #[arg(long, value_name = "ID")]
    pub lang: Option<String>,

    /// Compiler flags. Default: the compiler's catalog flags.
    #[arg(long, value_name = "STR", allow_hyphen_values = true)]
    pub flags: Option<String>,

    /// Also print the generated assembly.
    #[arg(long)]
    pub asm: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ShareArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[arg(long, value_name = "ID")]
    pub compiler: String,

    #[arg(long, value_name = "ID")]
    pub lang: Option<String>,

    #[arg(long, value_name = "STR", allow_hyphen_values = true)]
    pub flags: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
