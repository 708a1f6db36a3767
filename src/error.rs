use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClappError {
    #[error("Config must serialize to a struct-like mapping, found {found}")]
    ConfigMustBeAStruct { found: &'static str },

    #[error("Could not serialize config: {0}")]
    SerializingConfig(#[source] serde_yaml::Error),

    #[error("Config file {path} does not exist")]
    ConfigNotFound { path: PathBuf },

    #[error("Could not read config {path}: {source}")]
    ReadingFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not unmarshal config {path}: {source}")]
    UnmarshallingYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to override config with env vars: {0}")]
    OverridingConfigWithEnvFailed(#[from] EnvError),

    #[error("Expected the value of flag '--{flag}' to be of type {expected_type}")]
    IncorrectValueRefForFlag {
        flag: String,
        expected_type: &'static str,
    },

    #[error("Flag '{flag}' is declared more than once on command '{command}'")]
    DuplicateFlag { command: String, flag: String },

    #[error("Cannot mark '--{flag}' as required: the flag was never registered")]
    RequiredFlagNotRegistered { flag: String },

    #[error("Log level in config must be an integer")]
    LogLevelMustBeInt,

    #[error("Log format in config must be a string")]
    LogFormatMustBeString,

    #[error("Log format must be one of: console, json (got '{format}')")]
    InvalidLogFormat { format: String },

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error(transparent)]
    Handler(anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the environment override step.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("required variable {var} is not set")]
    Missing { var: String },

    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: String,
        value: String,
        expected: &'static str,
    },

    #[error("could not apply overrides: {0}")]
    Rebuild(#[source] serde_yaml::Error),
}
