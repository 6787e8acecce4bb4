#![allow(dead_code)]

use std::time::Duration;

use snipexec::config::model::{CompilerEntry, InterpreterOverride};
use snipexec::config::{CompilerCatalog, CompilerProfile, ConfigFile, RawConfigFile, RunnerSection};
use snipexec::engine::ExecutionOrchestrator;
use snipexec::exec::LocalExecutor;
use snipexec::fs::mock::MockFileSystem;
use snipexec::interpreter::{InterpreterRegistry, InterpreterResolver, InterpreterSpec};
use snipexec::remote::RemoteCompiler;
use snipexec::types::{ExecutionRequest, HostOs};

/// Builder for `ExecutionRequest`.
pub struct ExecutionRequestBuilder {
    request: ExecutionRequest,
}

impl ExecutionRequestBuilder {
    pub fn new(source: &str, extension: &str) -> Self {
        Self {
            request: ExecutionRequest::new(source, extension),
        }
    }

    pub fn target(mut self, id: &str) -> Self {
        self.request.target_id = Some(id.to_string());
        self
    }

    pub fn flags(mut self, flags: &str) -> Self {
        self.request.user_flags = flags.to_string();
        self
    }

    pub fn assembly(mut self, want: bool) -> Self {
        self.request.want_assembly = want;
        self
    }

    pub fn build(self) -> ExecutionRequest {
        self.request
    }
}

/// Builder for an `InterpreterRegistry` with the same name on every OS.
#[derive(Default)]
pub struct RegistryBuilder {
    registry: InterpreterRegistry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interpreter(mut self, extension: &str, program: &str, args: &[&str]) -> Self {
        self.registry
            .insert(InterpreterSpec::new(extension, program, program, program, args));
        self
    }

    pub fn build(self) -> InterpreterRegistry {
        self.registry
    }
}

/// Builder for `ConfigFile`, going through the same validation as a file.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.config.runner.timeout = duration.to_string();
        self
    }

    pub fn stream_output(mut self, stream: bool) -> Self {
        self.config.runner.stream_output = stream;
        self
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.remote.base_url = url.to_string();
        self
    }

    pub fn remote_timeout(mut self, duration: &str) -> Self {
        self.config.remote.timeout = duration.to_string();
        self
    }

    pub fn interpreter(mut self, extension: &str, linux: &str, args: &[&str]) -> Self {
        self.config.interpreter.insert(
            extension.to_string(),
            InterpreterOverride {
                linux: Some(linux.to_string()),
                args: Some(args.iter().map(|a| a.to_string()).collect()),
                ..InterpreterOverride::default()
            },
        );
        self
    }

    pub fn compiler(mut self, id: &str, language: &str, flags: &str, assembly: bool) -> Self {
        self.config.compiler.insert(
            id.to_string(),
            CompilerEntry {
                language: language.to_string(),
                flags: flags.to_string(),
                assembly,
            },
        );
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrator over fake backends.
///
/// The resolver sees an empty mock filesystem, so every interpreter resolves
/// to its bare registry name on Linux.
pub struct OrchestratorBuilder {
    registry: InterpreterRegistry,
    compilers: CompilerCatalog,
    runner: RunnerSection,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            registry: RegistryBuilder::new()
                .interpreter("py", "python3", &["-"])
                .interpreter("sh", "sh", &["-s"])
                .build(),
            compilers: CompilerCatalog::builtin(),
            runner: RunnerSection::default(),
        }
    }

    pub fn registry(mut self, registry: InterpreterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn compiler(mut self, id: &str, language: &str, flags: &str, assembly: bool) -> Self {
        self.compilers
            .insert(CompilerProfile::new(id, language, flags, assembly));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.runner.timeout = timeout;
        self
    }

    pub fn buffered(mut self) -> Self {
        self.runner.stream_output = false;
        self
    }

    pub fn build<L: LocalExecutor, R: RemoteCompiler>(
        self,
        local: L,
        remote: R,
    ) -> ExecutionOrchestrator<L, R> {
        let fs = std::sync::Arc::new(MockFileSystem::new());
        let resolver = InterpreterResolver::new(self.registry, HostOs::Linux, Some("/tools".into()))
            .with_file_system(fs);
        ExecutionOrchestrator::new(resolver, self.compilers, self.runner, local, remote)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
