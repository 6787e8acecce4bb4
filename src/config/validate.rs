// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    CompilerCatalog, CompilerEntry, CompilerProfile, ConfigFile, InterpreterOverride,
    RawConfigFile, RemoteSection, RunnerSection,
};
use crate::errors::{ExecError, Result};
use crate::interpreter::{normalize_extension, InterpreterRegistry, InterpreterSpec};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ExecError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let runner = RunnerSection {
            timeout: positive_duration("[runner].timeout", &raw.runner.timeout)?,
            tools_dir: raw.runner.tools_dir,
            stream_output: raw.runner.stream_output,
        };

        let remote = RemoteSection {
            base_url: validate_base_url(&raw.remote.base_url)?,
            timeout: positive_duration("[remote].timeout", &raw.remote.timeout)?,
        };

        let mut interpreters = InterpreterRegistry::builtin();
        for (ext, patch) in &raw.interpreter {
            apply_interpreter_override(&mut interpreters, ext, patch)?;
        }

        let mut compilers = CompilerCatalog::builtin();
        for (id, entry) in &raw.compiler {
            compilers.insert(compiler_profile(id, entry)?);
        }

        Ok(ConfigFile {
            runner,
            remote,
            interpreters,
            compilers,
        })
    }
}

fn positive_duration(field: &str, value: &str) -> Result<Duration> {
    let duration =
        parse_duration(value).map_err(|e| ExecError::ConfigError(format!("{field}: {e}")))?;
    if duration.is_zero() {
        return Err(ExecError::ConfigError(format!(
            "{field} must be greater than zero (got '{value}')"
        )));
    }
    Ok(duration)
}

fn validate_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match host {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ExecError::ConfigError(format!(
            "[remote].base_url must be an http(s) url (got '{url}')"
        ))),
    }
}

fn non_blank(field: &str, value: &Option<String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ExecError::ConfigError(format!(
            "{field} must not be empty"
        ))),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}

fn apply_interpreter_override(
    registry: &mut InterpreterRegistry,
    ext: &str,
    patch: &InterpreterOverride,
) -> Result<()> {
    let key = normalize_extension(ext);
    if key.is_empty() {
        return Err(ExecError::ConfigError(
            "[interpreter.<ext>] needs a non-empty extension".to_string(),
        ));
    }

    let windows = non_blank(&format!("[interpreter.{key}].windows"), &patch.windows)?;
    let linux = non_blank(&format!("[interpreter.{key}].linux"), &patch.linux)?;
    let mac = non_blank(&format!("[interpreter.{key}].mac"), &patch.mac)?;

    let spec = match registry.get(&key) {
        Some(existing) => InterpreterSpec {
            extension: key.clone(),
            windows: windows.unwrap_or_else(|| existing.windows.clone()),
            linux: linux.unwrap_or_else(|| existing.linux.clone()),
            mac: mac.unwrap_or_else(|| existing.mac.clone()),
            default_args: patch
                .args
                .clone()
                .unwrap_or_else(|| existing.default_args.clone()),
        },
        None => {
            let Some(fallback) = linux.clone().or_else(|| mac.clone()).or_else(|| windows.clone())
            else {
                return Err(ExecError::ConfigError(format!(
                    "[interpreter.{key}] is not built in and names no executable"
                )));
            };
            InterpreterSpec {
                extension: key.clone(),
                windows: windows.unwrap_or_else(|| fallback.clone()),
                linux: linux.unwrap_or_else(|| fallback.clone()),
                mac: mac.unwrap_or(fallback),
                default_args: patch.args.clone().unwrap_or_default(),
            }
        }
    };

    registry.insert(spec);
    Ok(())
}

fn compiler_profile(id: &str, entry: &CompilerEntry) -> Result<CompilerProfile> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ExecError::ConfigError(
            "[compiler.<id>] needs a non-empty id".to_string(),
        ));
    }
    if entry.language.trim().is_empty() {
        return Err(ExecError::ConfigError(format!(
            "[compiler.{id}].language is required"
        )));
    }
    Ok(CompilerProfile {
        id: id.to_string(),
        language: entry.language.trim().to_string(),
        default_flags: entry.flags.clone(),
        supports_assembly: entry.assembly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HostOs;

    fn parse(toml_text: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_text)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg, ConfigFile::default());
    }

    #[test]
    fn override_patches_builtin_row() {
        let cfg = parse(
            r#"
            [interpreter.PY]
            linux = "python3.12"
            "#,
        )
        .unwrap();
        let spec = cfg.interpreters.get("py").unwrap();
        assert_eq!(spec.executable_for(HostOs::Linux), "python3.12");
        assert_eq!(spec.executable_for(HostOs::Windows), "python.exe");
        assert_eq!(spec.default_args, vec!["-".to_string()]);
    }

    #[test]
    fn new_interpreter_fills_missing_os_names() {
        let cfg = parse(
            r#"
            [interpreter.tcl]
            linux = "tclsh"
            "#,
        )
        .unwrap();
        let spec = cfg.interpreters.get("tcl").unwrap();
        for os in HostOs::ALL {
            assert_eq!(spec.executable_for(os), "tclsh");
        }
    }

    #[test]
    fn new_interpreter_without_executable_is_rejected() {
        let err = parse("[interpreter.tcl]\nargs = [\"-\"]\n").unwrap_err();
        assert!(err.to_string().contains("names no executable"), "{err}");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = parse("[runner]\ntimeout = \"0s\"\n").unwrap_err();
        assert!(err.to_string().contains("greater than zero"), "{err}");
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(parse("[remote]\nbase_url = \"ftp://example.com\"\n").is_err());
        let cfg = parse("[remote]\nbase_url = \"http://localhost:10240/\"\n").unwrap();
        assert_eq!(cfg.remote.base_url, "http://localhost:10240");
    }

    #[test]
    fn compiler_requires_language() {
        assert!(parse("[compiler.mine]\nflags = \"-O3\"\n").is_err());
        let cfg = parse("[compiler.mine]\nlanguage = \"c++\"\nassembly = false\n").unwrap();
        let profile = cfg.compilers.get("mine").unwrap();
        assert!(!profile.supports_assembly);
        assert_eq!(profile.default_flags, "");
    }
}
