// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod interpreter;
pub mod logging;
pub mod remote;
pub mod types;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, RemoteArgs, RunArgs, ShareArgs};
use crate::config::{load_or_default, parse_duration, ConfigFile};
use crate::engine::ExecutionOrchestrator;
use crate::exec::{FnSink, ProcessRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::interpreter::{default_tools_dir, InterpreterResolver};
use crate::remote::RemoteExecutionClient;
use crate::types::{ExecutionRequest, ExecutionResult, HostOs};

type Orchestrator = ExecutionOrchestrator<ProcessRunner, RemoteExecutionClient>;

/// High-level entry point used by `main.rs`.
///
/// Returns whether the snippet ran successfully; configuration and IO
/// problems are errors.
pub async fn run(args: CliArgs) -> Result<bool> {
    let mut cfg = load_or_default(args.config.as_deref()).context("loading configuration")?;

    match args.command {
        Command::Run(run) => {
            apply_run_overrides(&mut cfg, &run)?;
            run_local(&cfg, run).await
        }
        Command::Remote(remote) => run_remote(&cfg, remote).await,
        Command::Share(share) => run_share(&cfg, share).await,
        Command::Interpreters => {
            print_interpreters(&cfg);
            Ok(true)
        }
    }
}

fn apply_run_overrides(cfg: &mut ConfigFile, run: &RunArgs) -> Result<()> {
    if let Some(timeout) = &run.timeout {
        let timeout = parse_duration(timeout).map_err(anyhow::Error::msg)?;
        anyhow::ensure!(!timeout.is_zero(), "--timeout must be greater than zero");
        cfg.runner.timeout = timeout;
    }
    if run.buffered {
        cfg.runner.stream_output = false;
    }
    Ok(())
}

fn read_snippet(path: &Path) -> Result<String> {
    RealFileSystem
        .read_to_string(path)
        .with_context(|| format!("failed to read snippet {}", path.display()))
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Ctrl-C kills whatever the orchestrator is running.
fn kill_on_ctrl_c(orchestrator: &Arc<Orchestrator>) {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; stopping run");
        orchestrator.kill();
    });
}

async fn run_local(cfg: &ConfigFile, args: RunArgs) -> Result<bool> {
    let source = read_snippet(&args.file)?;
    let extension = file_extension(&args.file);

    let streaming = cfg.runner.stream_output;
    let mut orchestrator = Orchestrator::from_config(cfg)?;
    if streaming {
        orchestrator = orchestrator.with_observer(Arc::new(FnSink::new(
            |line: String| println!("{line}"),
            |line: String| eprintln!("{line}"),
        )));
    }
    let orchestrator = Arc::new(orchestrator);
    orchestrator.select_interpreter(args.ext.as_deref().unwrap_or(&extension));
    kill_on_ctrl_c(&orchestrator);

    let mut request = ExecutionRequest::new(source, extension);
    request.target_id = args.ext;
    request.user_flags = args.flags.unwrap_or_default();

    let result = orchestrator.run_local(request).await?;
    if !streaming {
        print_output(&result)?;
    }
    report_error(&result);
    Ok(result.succeeded)
}

async fn run_remote(cfg: &ConfigFile, args: RemoteArgs) -> Result<bool> {
    let source = read_snippet(&args.file)?;
    let orchestrator = Arc::new(Orchestrator::from_config(cfg)?);
    orchestrator.select_compiler(&args.compiler);
    orchestrator.set_language(args.lang);
    kill_on_ctrl_c(&orchestrator);

    let selection = orchestrator.snapshot().selection;
    let mut request = ExecutionRequest::new(source, file_extension(&args.file));
    request.target_id = Some(args.compiler);
    request.user_flags = args.flags.unwrap_or(selection.flags);
    request.want_assembly = args.asm;

    let result = orchestrator.run_remote(request).await?;
    if let Some(asm) = &result.assembly {
        println!("{asm}");
        println!();
    }
    print_output(&result)?;
    report_error(&result);
    Ok(result.succeeded)
}

async fn run_share(cfg: &ConfigFile, args: ShareArgs) -> Result<bool> {
    let source = read_snippet(&args.file)?;
    let orchestrator = Orchestrator::from_config(cfg)?;
    orchestrator.select_compiler(&args.compiler);
    orchestrator.set_language(args.lang);

    let selection = orchestrator.snapshot().selection;
    let mut request = ExecutionRequest::new(source, file_extension(&args.file));
    request.target_id = Some(args.compiler);
    request.user_flags = args.flags.unwrap_or(selection.flags);

    let link = orchestrator.share(request).await?;
    match link.error {
        None => {
            println!("{}", link.url);
            Ok(true)
        }
        Some(message) => {
            eprintln!("error: {message}");
            Ok(false)
        }
    }
}

fn print_output(result: &ExecutionResult) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(result.stdout.as_bytes())?;
    if !result.stdout.is_empty() && !result.stdout.ends_with('\n') {
        writeln!(stdout)?;
    }
    stdout.flush()?;

    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
        if !result.stderr.ends_with('\n') {
            eprintln!();
        }
    }
    Ok(())
}

fn report_error(result: &ExecutionResult) {
    if let Some(message) = &result.error_message {
        eprintln!("error: {message}");
    }
}

/// Print the resolved interpreter for every registry row on this host.
fn print_interpreters(cfg: &ConfigFile) {
    let os = HostOs::current();
    let tools_dir = cfg.runner.tools_dir.clone().or_else(default_tools_dir);
    debug!(%os, tools_dir = ?tools_dir, "resolving interpreter table");
    let resolver = InterpreterResolver::new(cfg.interpreters.clone(), os, tools_dir);

    println!("interpreters for {os}:");
    for spec in resolver.registry().iter() {
        if let Some(resolved) = resolver.resolve(&spec.extension) {
            let origin = if resolved.bundled { " (bundled)" } else { "" };
            println!(
                "  {:<6} {}{} {}",
                spec.extension,
                resolved.program.display(),
                origin,
                resolved.default_args.join(" ")
            );
        }
    }
}
