//! Filesystem capabilities used to read application config files.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Minimal read-only filesystem consulted for application config layers.
pub trait ConfigFs {
    /// Whether an entry named `name` exists. Missing entries are `Ok(false)`.
    fn exists(&self, name: &str) -> io::Result<bool>;
    /// Read the full contents of `name`.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Files under a directory on the operating system filesystem.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    /// Serve files relative to `root`. The directory need not exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory file names are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ConfigFs for DirFs {
    fn exists(&self, name: &str) -> io::Result<bool> {
        match fs::metadata(self.root.join(name)) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(name))
    }
}

/// In-memory file set, used for config compiled into a binary and in tests.
///
/// ```
/// use keystone_rs_config::{ConfigFs, MemoryFs};
///
/// let files = MemoryFs::new().with_file("config.yaml", "server:\n  address: \":9000\"\n");
/// assert!(files.exists("config.yaml").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFs {
    /// An empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from static pairs, typically produced with `include_bytes!`.
    pub fn from_static(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, contents)| (name.to_string(), contents.to_vec()))
                .collect(),
        }
    }

    /// Builder form of [`MemoryFs::insert`].
    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    /// Add or replace a file.
    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), contents.into());
    }
}

impl ConfigFs for MemoryFs {
    fn exists(&self, name: &str) -> io::Result<bool> {
        Ok(self.files.contains_key(name))
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{name} not found"))
        })
    }
}
