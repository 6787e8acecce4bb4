// src/interpreter/resolver.rs

//! Extension + host OS + bundled-tools directory → executable to spawn.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};
use crate::interpreter::registry::{normalize_extension, InterpreterRegistry};
use crate::types::HostOs;

/// What the runner should launch for a given extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInterpreter {
    pub extension: String,
    /// Absolute path inside the tools directory, or the bare registry name
    /// left for `PATH` lookup at spawn time.
    pub program: PathBuf,
    pub default_args: Vec<String>,
    pub bundled: bool,
}

#[derive(Debug, Clone)]
pub struct InterpreterResolver {
    registry: InterpreterRegistry,
    os: HostOs,
    tools_dir: Option<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl InterpreterResolver {
    pub fn new(registry: InterpreterRegistry, os: HostOs, tools_dir: Option<PathBuf>) -> Self {
        Self {
            registry,
            os,
            tools_dir,
            fs: Arc::new(RealFileSystem),
        }
    }

    /// Swap the filesystem used for the bundled-tools check.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn registry(&self) -> &InterpreterRegistry {
        &self.registry
    }

    pub fn os(&self) -> HostOs {
        self.os
    }

    /// Look up `extension`. Returns `None` only when the registry has no row.
    ///
    /// A returned bare name is not guaranteed to exist on `PATH`; that
    /// surfaces as a spawn failure.
    pub fn resolve(&self, extension: &str) -> Option<ResolvedInterpreter> {
        let key = normalize_extension(extension);
        let spec = self.registry.get(&key)?;
        let name = spec.executable_for(self.os);

        let bundled = self
            .tools_dir
            .as_deref()
            .map(|dir| dir.join(name))
            .filter(|candidate| self.fs.is_file(candidate));

        let resolved = match bundled {
            Some(candidate) => ResolvedInterpreter {
                extension: key,
                program: absolutize(&candidate),
                default_args: spec.default_args.clone(),
                bundled: true,
            },
            None => ResolvedInterpreter {
                extension: key,
                program: PathBuf::from(name),
                default_args: spec.default_args.clone(),
                bundled: false,
            },
        };

        debug!(
            extension = %resolved.extension,
            program = %resolved.program.display(),
            bundled = resolved.bundled,
            os = %self.os,
            "resolved interpreter"
        );

        Some(resolved)
    }
}

/// `tools` next to the running executable.
pub fn default_tools_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("tools")))
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::interpreter::registry::InterpreterSpec;

    fn registry() -> InterpreterRegistry {
        let mut r = InterpreterRegistry::new();
        r.insert(InterpreterSpec::new("py", "python.exe", "python3", "python3-mac", &["-"]));
        r
    }

    #[test]
    fn picks_name_for_host_os() {
        let linux = InterpreterResolver::new(registry(), HostOs::Linux, None);
        let mac = InterpreterResolver::new(registry(), HostOs::Mac, None);
        let unknown = InterpreterResolver::new(registry(), HostOs::Unknown, None);

        assert_eq!(linux.resolve("py").unwrap().program, PathBuf::from("python3"));
        assert_eq!(mac.resolve(".PY").unwrap().program, PathBuf::from("python3-mac"));
        assert_eq!(unknown.resolve("py").unwrap().program, PathBuf::from("python.exe"));
    }

    #[test]
    fn prefers_bundled_tool_when_present() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/snip/tools/python3", "#!");

        let resolver = InterpreterResolver::new(
            registry(),
            HostOs::Linux,
            Some(PathBuf::from("/opt/snip/tools")),
        )
        .with_file_system(Arc::new(fs));

        let resolved = resolver.resolve("py").unwrap();
        assert!(resolved.bundled);
        assert_eq!(resolved.program, PathBuf::from("/opt/snip/tools/python3"));
        assert_eq!(resolved.default_args, vec!["-".to_string()]);
    }

    #[test]
    fn falls_back_to_bare_name_without_bundled_file() {
        let resolver = InterpreterResolver::new(
            registry(),
            HostOs::Linux,
            Some(PathBuf::from("/opt/snip/tools")),
        )
        .with_file_system(Arc::new(MockFileSystem::new()));

        let resolved = resolver.resolve("py").unwrap();
        assert!(!resolved.bundled);
        assert_eq!(resolved.program, PathBuf::from("python3"));
    }

    #[test]
    fn unknown_extension_is_not_found() {
        let resolver = InterpreterResolver::new(registry(), HostOs::Linux, None);
        assert!(resolver.resolve("cobol").is_none());
        assert!(resolver.resolve("").is_none());
    }
}
