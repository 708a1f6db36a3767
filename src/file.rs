//! Locating and reading the YAML config file.
//!
//! The file is looked up through the [`Filesystem`] abstraction. Existence is
//! checked before anything is read, so a missing file is always reported as
//! [`ClappError::ConfigNotFound`] and never as a read or parse failure.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::ClappError;
use crate::fs::Filesystem;

/// The default config path for an app: `./{app_name}.yaml`.
pub fn default_path(app_name: &str) -> PathBuf {
    PathBuf::from(format!("./{app_name}.yaml"))
}

/// Read and parse the config file at `path`.
///
/// An empty document parses to [`Value::Null`].
pub fn read_config_file(fs: &dyn Filesystem, path: &Path) -> Result<Value, ClappError> {
    let exists = fs.exists(path).map_err(|e| ClappError::ReadingFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !exists {
        return Err(ClappError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs.read(path).map_err(|e| ClappError::ReadingFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_yaml::from_slice(&bytes).map_err(|e| ClappError::UnmarshallingYaml {
        path: path.to_path_buf(),
        source: e,
    })
}
