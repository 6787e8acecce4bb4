// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::interpreter::InterpreterRegistry;

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BASE_URL: &str = "https://godbolt.org";

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [runner]
/// timeout = "10s"
/// tools_dir = "/opt/snipexec/tools"
/// stream_output = true
///
/// [remote]
/// base_url = "https://godbolt.org"
/// timeout = "30s"
///
/// [interpreter.py]
/// linux = "python3.12"
/// args = ["-u", "-"]
///
/// [compiler.g132]
/// language = "c++"
/// flags = "-O2"
/// assembly = true
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RawRunnerSection,

    #[serde(default)]
    pub remote: RawRemoteSection,

    /// Keyed by extension. Patches a built-in row or adds a new one.
    #[serde(default)]
    pub interpreter: BTreeMap<String, InterpreterOverride>,

    /// Keyed by compiler id. Added to (or replacing) the built-in catalog.
    #[serde(default)]
    pub compiler: BTreeMap<String, CompilerEntry>,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRunnerSection {
    /// Duration string such as `"10s"` or `"250ms"`.
    #[serde(default = "default_run_timeout")]
    pub timeout: String,

    /// Directory searched for bundled interpreters before falling back to
    /// `PATH`. Defaults to `tools/` next to the executable.
    #[serde(default)]
    pub tools_dir: Option<PathBuf>,

    /// Deliver output line by line (`true`) or all at once when the run ends.
    #[serde(default = "default_stream_output")]
    pub stream_output: bool,
}

fn default_run_timeout() -> String {
    "10s".to_string()
}

fn default_stream_output() -> bool {
    true
}

impl Default for RawRunnerSection {
    fn default() -> Self {
        Self {
            timeout: default_run_timeout(),
            tools_dir: None,
            stream_output: default_stream_output(),
        }
    }
}

/// `[remote]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRemoteSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_remote_timeout")]
    pub timeout: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_remote_timeout() -> String {
    "30s".to_string()
}

impl Default for RawRemoteSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_remote_timeout(),
        }
    }
}

/// `[interpreter.<ext>]` section.
///
/// For a new extension, OS names left out are filled from the first one
/// given, in the order linux, mac, windows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterpreterOverride {
    #[serde(default)]
    pub windows: Option<String>,
    #[serde(default)]
    pub linux: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    /// Replaces the default arguments entirely.
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

/// `[compiler.<id>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerEntry {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub flags: String,
    #[serde(default = "default_assembly")]
    pub assembly: bool,
}

fn default_assembly() -> bool {
    true
}

/// Validated `[runner]` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSection {
    pub timeout: Duration,
    pub tools_dir: Option<PathBuf>,
    pub stream_output: bool,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RUN_TIMEOUT,
            tools_dir: None,
            stream_output: true,
        }
    }
}

/// Validated `[remote]` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSection {
    /// No trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

/// Defaults attached to one remote compiler. Selecting a compiler resets the
/// session's flags and assembly hint from its profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerProfile {
    pub id: String,
    pub language: String,
    pub default_flags: String,
    pub supports_assembly: bool,
}

impl CompilerProfile {
    pub fn new(id: &str, language: &str, default_flags: &str, supports_assembly: bool) -> Self {
        Self {
            id: id.to_string(),
            language: language.to_string(),
            default_flags: default_flags.to_string(),
            supports_assembly,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerCatalog {
    profiles: BTreeMap<String, CompilerProfile>,
}

impl CompilerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handful of common Compiler Explorer compilers.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for profile in [
            CompilerProfile::new("g132", "c++", "-O2 -std=c++20", true),
            CompilerProfile::new("clang1701", "c++", "-O2 -std=c++20", true),
            CompilerProfile::new("cg132", "c", "-O2", true),
            CompilerProfile::new("cclang1701", "c", "-O2", true),
            CompilerProfile::new("r1830", "rust", "-C opt-level=2", true),
            CompilerProfile::new("gl1220", "go", "", true),
            CompilerProfile::new("python312", "python", "", false),
        ] {
            catalog.insert(profile);
        }
        catalog
    }

    pub fn insert(&mut self, profile: CompilerProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn get(&self, id: &str) -> Option<&CompilerProfile> {
        self.profiles.get(id.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompilerProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Validated configuration used by the rest of the application.
///
/// Built from [`RawConfigFile`] via `TryFrom`, which checks values and merges
/// the interpreter and compiler sections onto the built-in tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub runner: RunnerSection,
    pub remote: RemoteSection,
    pub interpreters: InterpreterRegistry,
    pub compilers: CompilerCatalog,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            runner: RunnerSection::default(),
            remote: RemoteSection::default(),
            interpreters: InterpreterRegistry::builtin(),
            compilers: CompilerCatalog::builtin(),
        }
    }
}
