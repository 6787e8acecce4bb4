// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The level comes from `--log-level` when given, otherwise from the
//! `SNIPEXEC_LOG` environment variable (any `EnvFilter` directive, such as
//! `debug` or `snipexec::remote=trace`), otherwise `info`. Output goes to
//! stderr; stdout is reserved for snippet output.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "SNIPEXEC_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(cli_level, env.as_deref()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(Level::from(level).as_str());
    }
    env.map(str::trim)
        .filter(|directive| !directive.is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_beats_environment() {
        let filter = build_filter(Some(LogLevel::Trace), Some("error"));
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    fn environment_directive_is_used_when_valid() {
        assert_eq!(
            build_filter(None, Some("snipexec=debug")).to_string(),
            "snipexec=debug"
        );
        assert_eq!(build_filter(None, Some("  ")).to_string(), "info");
        assert_eq!(build_filter(None, None).to_string(), "info");
    }
}
