// src/fs/mod.rs

use std::fmt::Debug;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// Filesystem access used by the resolver (probing bundled interpreters) and
/// the CLI (reading snippet files).
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn is_file(&self, path: &Path) -> bool;
}

/// Backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading snippet {}", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
