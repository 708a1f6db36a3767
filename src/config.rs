//! Populating the caller's configuration from the file and the environment.
//!
//! The configuration is mutated in place in two stages, each working on the
//! serialized shape of the struct:
//!
//! 1. [`ConfigLoader::load`] deep-merges the YAML file over the current
//!    values. Fields missing from the file keep whatever the caller set.
//! 2. [`ConfigLoader::override_with_env`] overlays matching environment
//!    variables (`{PREFIX}_{FIELD_PATH}`).
//!
//! Flags are applied later by the executor, which gives the precedence
//! flag > environment > file > default. Each stage replaces the target only
//! once its whole result deserialized, so a failing stage leaves the
//! configuration untouched. Fields skipped by serde do not survive a stage
//! unless the type restores them in [`AppConfig::restore_skipped`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::env;
use crate::error::{ClappError, EnvError};
use crate::file;
use crate::fs::Filesystem;
use crate::logger;
use crate::merge::deep_merge;

/// A configuration type the framework can populate.
///
/// Any `Serialize + DeserializeOwned` struct qualifies with an empty impl:
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct MyConfig { name: String, log_level: i64 }
///
/// impl AppConfig for MyConfig {}
/// ```
///
/// The log methods are optional capabilities. Their default implementations
/// look for top-level `log_level` (integer) and `log_format` (string) fields;
/// override them to expose the values some other way.
pub trait AppConfig: Serialize + DeserializeOwned {
    /// Dotted field paths whose environment variable must be set.
    fn required_env() -> &'static [&'static str] {
        &[]
    }

    /// The log level to apply before the handler runs, if any.
    fn log_level(&self) -> Result<Option<i64>, ClappError> {
        logger::probe_log_level(self)
    }

    /// The log format (`console` or `json`) to apply before the handler runs,
    /// if any.
    fn log_format(&self) -> Result<Option<String>, ClappError> {
        logger::probe_log_format(self)
    }

    /// Called after the file or environment stage rebuilt the configuration,
    /// with the value it replaced.
    ///
    /// Each stage goes through the serialized form, so fields that do not
    /// serialize (`#[serde(skip)]`) come back as their defaults. Copy them
    /// over from `previous` here to keep them.
    fn restore_skipped(&mut self, previous: Self) {
        let _ = previous;
    }
}

/// Install a rebuilt configuration in place of `target`.
fn replace_config<C: AppConfig>(target: &mut C, rebuilt: C) {
    let previous = std::mem::replace(target, rebuilt);
    target.restore_skipped(previous);
}

/// Serialize `config` and check that it is struct-like.
pub(crate) fn snapshot<C: Serialize + ?Sized>(config: &C) -> Result<Mapping, ClappError> {
    match serde_yaml::to_value(config).map_err(ClappError::SerializingConfig)? {
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(ClappError::ConfigMustBeAStruct {
            found: kind_name(&other),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Loads the config file and environment overrides into a configuration.
pub struct ConfigLoader {
    path: PathBuf,
    fs: Arc<dyn Filesystem>,
    must_exist: bool,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// A loader for `app_name`. This derives sensible defaults:
    /// - `path` → `"./{app_name}.yaml"`
    /// - `env_prefix` → `"{APP_NAME}"` (uppercased, `-` becomes `_`)
    pub fn new(app_name: &str, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            path: file::default_path(app_name),
            fs,
            must_exist: false,
            env_prefix: Some(env::prefix_for(app_name)),
        }
    }

    /// Override the config file path.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Fail with [`ClappError::ConfigNotFound`] when the file is missing.
    pub fn must_exist(mut self, must_exist: bool) -> Self {
        self.must_exist = must_exist;
        self
    }

    /// Override the environment variable prefix.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Disable environment variable overrides entirely.
    pub fn no_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// Merge the config file into `target`.
    ///
    /// Returns [`ClappError::ConfigNotFound`] whenever the file is absent,
    /// regardless of `must_exist`; see [`apply_file`](Self::apply_file).
    pub fn load<C: AppConfig>(&self, target: &mut C) -> Result<(), ClappError> {
        let contents = file::read_config_file(self.fs.as_ref(), &self.path)?;
        let overlay = match contents {
            Value::Null => return Ok(()),
            Value::Mapping(mapping) => Value::Mapping(deep_merge(snapshot(target)?, mapping)),
            // Not a mapping: let deserialization report the mismatch.
            other => other,
        };

        let rebuilt = serde_yaml::from_value(overlay).map_err(|e| ClappError::UnmarshallingYaml {
            path: self.path.clone(),
            source: e,
        })?;
        replace_config(target, rebuilt);
        tracing::debug!(path = %self.path.display(), "loaded config file");
        Ok(())
    }

    /// Like [`load`](Self::load), but a missing file is only an error when
    /// `must_exist` is set.
    pub fn apply_file<C: AppConfig>(&self, target: &mut C) -> Result<(), ClappError> {
        match self.load(target) {
            Err(ClappError::ConfigNotFound { path }) if !self.must_exist => {
                tracing::debug!(path = %path.display(), "no config file, keeping defaults");
                Ok(())
            }
            other => other,
        }
    }

    /// Override fields of `target` from the process environment.
    pub fn override_with_env<C: AppConfig>(&self, target: &mut C) -> Result<(), ClappError> {
        self.override_with_vars(target, std::env::vars())
    }

    /// Override fields of `target` from the given variables.
    ///
    /// Fields holding null or an empty list give no type to parse against.
    /// Their variables are parsed heuristically (bool, integer, float) and
    /// read as plain text when the heuristic value does not fit the field.
    pub fn override_with_vars<C: AppConfig>(
        &self,
        target: &mut C,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ClappError> {
        let Some(prefix) = &self.env_prefix else {
            return Ok(());
        };

        let current = snapshot(target)?;
        let overlay = env::env_overlay(prefix, &current, vars, C::required_env())?;
        if overlay.is_empty() {
            return Ok(());
        }

        let overlay = overlay.settle(|leaf| {
            let trial = Value::Mapping(deep_merge(current.clone(), leaf));
            serde_yaml::from_value::<C>(trial).is_ok()
        });

        let merged = Value::Mapping(deep_merge(current, overlay));
        let rebuilt = serde_yaml::from_value(merged).map_err(EnvError::Rebuild)?;
        replace_config(target, rebuilt);
        Ok(())
    }
}
