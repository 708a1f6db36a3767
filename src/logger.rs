//! Application logger and the pre-run adjuster.
//!
//! The logger is a [`tracing`] subscriber built from a small set of settings
//! ([`Logger`]): max level, output format and output target. It is never
//! installed globally. [`LogManager`] keeps the settings together with the
//! [`Dispatch`] built from them, and the framework scopes that dispatch
//! around config loading and around the handler.
//!
//! Before a handler runs, [`update_logger_pre_run`] asks the configuration
//! for a log level and a log format (see [`AppConfig`]) and applies them,
//! level first.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_yaml::Value;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::{AppConfig, snapshot};
use crate::context::Context;
use crate::error::ClappError;

/// Config key probed by the default [`AppConfig::log_level`].
pub const LOG_LEVEL_FIELD: &str = "log_level";
/// Config key probed by the default [`AppConfig::log_format`].
pub const LOG_FORMAT_FIELD: &str = "log_format";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Console,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ClappError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            other => Err(ClappError::InvalidLogFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Console => write!(f, "console"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    #[default]
    Stderr,
    Stdout,
    /// An in-memory buffer, handy for inspecting output.
    Buffer(LogBuffer),
}

/// A cloneable, shared in-memory log sink.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogTarget {
    type Writer = Box<dyn io::Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match self {
            LogTarget::Stderr => Box::new(io::stderr()),
            LogTarget::Stdout => Box::new(io::stdout()),
            LogTarget::Buffer(buffer) => Box::new(buffer.clone()),
        }
    }
}

/// Logger settings: the starting point handed to [`App`](crate::App).
#[derive(Debug, Clone)]
pub struct Logger {
    level: LevelFilter,
    format: LogFormat,
    target: LogTarget,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::default(),
            target: LogTarget::default(),
        }
    }
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Build a subscriber from these settings.
    pub fn dispatch(&self) -> Dispatch {
        let ansi = !matches!(self.target, LogTarget::Buffer(_));
        let builder = tracing_subscriber::fmt()
            .with_max_level(self.level)
            .with_ansi(ansi)
            .with_writer(self.target.clone());

        match self.format {
            LogFormat::Console => Dispatch::new(builder.finish()),
            LogFormat::Json => Dispatch::new(builder.json().finish()),
        }
    }
}

/// Map an integer log level onto a tracing level.
///
/// The scale is the conventional one where `-1` is trace and `0..=2` are
/// debug, info and warn. Values outside the scale saturate: anything below
/// `-1` is trace, `3..=5` are error and `6` or above turns logging off.
pub fn level_filter(level: i64) -> LevelFilter {
    match level {
        i64::MIN..=-1 => LevelFilter::TRACE,
        0 => LevelFilter::DEBUG,
        1 => LevelFilter::INFO,
        2 => LevelFilter::WARN,
        3..=5 => LevelFilter::ERROR,
        _ => LevelFilter::OFF,
    }
}

/// The active logger, reachable through the [`Context`].
#[derive(Debug, Clone)]
pub struct LogManager {
    logger: Logger,
    dispatch: Dispatch,
}

impl LogManager {
    pub fn new(logger: Logger) -> Self {
        let dispatch = logger.dispatch();
        Self { logger, dispatch }
    }

    /// Change the max level. Any integer is accepted, see [`level_filter`].
    pub fn change_level(&mut self, level: i64) {
        self.set_level(level_filter(level));
    }

    pub fn set_level(&mut self, level: LevelFilter) {
        self.logger.level = level;
        self.dispatch = self.logger.dispatch();
    }

    /// Change the output format; must be `console` or `json`.
    pub fn change_format(&mut self, format: &str) -> Result<(), ClappError> {
        self.logger.format = format.parse()?;
        self.dispatch = self.logger.dispatch();
        Ok(())
    }

    pub fn level(&self) -> LevelFilter {
        self.logger.level
    }

    pub fn format(&self) -> LogFormat {
        self.logger.format
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

/// Apply the configuration's log level and log format to the context's
/// logger, in that order. A config that exposes neither is left alone.
pub fn update_logger_pre_run<C: AppConfig>(ctx: &Context<'_, C>) -> Result<(), ClappError> {
    let config = ctx.config();

    if let Some(level) = config.log_level()? {
        ctx.log_manager().change_level(level);
        tracing::debug!(level, "log level taken from config");
    }

    if let Some(format) = config.log_format()? {
        ctx.log_manager().change_format(&format)?;
    }

    Ok(())
}

/// Structural lookup of a top-level config field. Null counts as absent.
fn probe<C: Serialize>(config: &C, field: &str) -> Result<Option<Value>, ClappError> {
    let mapping = snapshot(config)?;
    Ok(mapping.get(field).filter(|v| !v.is_null()).cloned())
}

/// Default [`AppConfig::log_level`]: read an integer `log_level` field.
pub fn probe_log_level<C: Serialize>(config: &C) -> Result<Option<i64>, ClappError> {
    match probe(config, LOG_LEVEL_FIELD)? {
        None => Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(level) => Ok(Some(level)),
            // Integers beyond i64 saturate like any other out-of-range level.
            None if n.is_u64() => Ok(Some(i64::MAX)),
            None => Err(ClappError::LogLevelMustBeInt),
        },
        Some(_) => Err(ClappError::LogLevelMustBeInt),
    }
}

/// Default [`AppConfig::log_format`]: read a string `log_format` field.
pub fn probe_log_format<C: Serialize>(config: &C) -> Result<Option<String>, ClappError> {
    match probe(config, LOG_FORMAT_FIELD)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ClappError::LogFormatMustBeString),
    }
}
