// src/interpreter/registry.rs

//! Static table mapping a snippet extension to per-OS interpreter names.

use std::collections::BTreeMap;

use crate::types::HostOs;

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterSpec {
    /// Normalized extension key (no leading dot, lowercase).
    pub extension: String,
    pub windows: String,
    pub linux: String,
    pub mac: String,
    /// Arguments placed after user flags. They make the interpreter read the
    /// program text from stdin.
    pub default_args: Vec<String>,
}

impl InterpreterSpec {
    pub fn new(
        extension: &str,
        windows: &str,
        linux: &str,
        mac: &str,
        default_args: &[&str],
    ) -> Self {
        Self {
            extension: normalize_extension(extension),
            windows: windows.to_string(),
            linux: linux.to_string(),
            mac: mac.to_string(),
            default_args: default_args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Executable name for `os`. An undetermined OS gets the windows name.
    pub fn executable_for(&self, os: HostOs) -> &str {
        match os {
            HostOs::Linux => &self.linux,
            HostOs::Mac => &self.mac,
            HostOs::Windows | HostOs::Unknown => &self.windows,
        }
    }
}

/// Interpreter table, passed by value into the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterRegistry {
    specs: BTreeMap<String, InterpreterSpec>,
}

impl InterpreterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in table.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in [
            InterpreterSpec::new("py", "python.exe", "python3", "python3", &["-"]),
            InterpreterSpec::new("js", "node.exe", "node", "node", &["-"]),
            InterpreterSpec::new("ts", "deno.exe", "deno", "deno", &["run", "-"]),
            InterpreterSpec::new("rb", "ruby.exe", "ruby", "ruby", &["-"]),
            InterpreterSpec::new("pl", "perl.exe", "perl", "perl", &["-"]),
            InterpreterSpec::new("php", "php.exe", "php", "php", &[]),
            InterpreterSpec::new("lua", "lua.exe", "lua", "lua", &["-"]),
            InterpreterSpec::new("sh", "bash.exe", "sh", "sh", &["-s"]),
            InterpreterSpec::new("bash", "bash.exe", "bash", "bash", &["-s"]),
            InterpreterSpec::new(
                "ps1",
                "powershell.exe",
                "pwsh",
                "pwsh",
                &["-NoLogo", "-NoProfile", "-Command", "-"],
            ),
            InterpreterSpec::new("r", "Rscript.exe", "Rscript", "Rscript", &["-"]),
            InterpreterSpec::new("jl", "julia.exe", "julia", "julia", &["-"]),
            InterpreterSpec::new("swift", "swift.exe", "swift", "swift", &["-"]),
        ] {
            registry.insert(spec);
        }
        registry
    }

    /// Insert or replace a row, keyed by its normalized extension.
    pub fn insert(&mut self, spec: InterpreterSpec) {
        self.specs.insert(spec.extension.clone(), spec);
    }

    pub fn get(&self, extension: &str) -> Option<&InterpreterSpec> {
        self.specs.get(&normalize_extension(extension))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterpreterSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Strip a leading dot, trim whitespace and lowercase.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_and_case() {
        assert_eq!(normalize_extension(".PY"), "py");
        assert_eq!(normalize_extension("  Js "), "js");
        assert_eq!(normalize_extension("rb"), "rb");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn lookup_ignores_dot_and_case() {
        let registry = InterpreterRegistry::builtin();
        let spec = registry.get(".Py").expect("py is built in");
        assert_eq!(spec.extension, "py");
        assert_eq!(spec.default_args, vec!["-".to_string()]);
    }

    #[test]
    fn unknown_os_falls_back_to_windows_name() {
        let spec = InterpreterSpec::new("py", "python.exe", "python3", "python3", &[]);
        assert_eq!(spec.executable_for(HostOs::Unknown), "python.exe");
        assert_eq!(spec.executable_for(HostOs::Mac), "python3");
    }

    #[test]
    fn insert_replaces_existing_row() {
        let mut registry = InterpreterRegistry::builtin();
        let before = registry.len();
        registry.insert(InterpreterSpec::new(".PY", "py.exe", "pypy3", "pypy3", &["-"]));
        assert_eq!(registry.len(), before);
        assert_eq!(registry.get("py").unwrap().linux, "pypy3");
    }
}
