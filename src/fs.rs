//! Filesystem abstraction used to locate and read config files.
//!
//! The loader never touches `std::fs` directly; it goes through the
//! [`Filesystem`] carried by the [`Context`](crate::Context). [`OsFs`] is the
//! host filesystem and the default whenever none is supplied. [`MemFs`] keeps
//! files in memory, which makes it easy to exercise the full pipeline without
//! touching disk.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// The filesystem operations the config loader needs.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Read the whole file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl Filesystem for OsFs {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// An in-memory filesystem.
///
/// Paths are normalized by dropping `.` components, so `./app.yaml` and
/// `app.yaml` refer to the same file.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file.
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(normalize(path.as_ref()), contents.into());
        self
    }
}

impl Filesystem for MemFs {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.files.contains_key(&normalize(path)))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
