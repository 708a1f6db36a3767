//! Declarative command trees with a layered, typed configuration. Describe
//! your commands, hand over your config struct, and go.
//!
//! Clapp lets an application declare its command-line interface (commands,
//! flags, handlers) as plain data and have a typed configuration populated
//! from a YAML file, environment variables and flags before the matched
//! handler runs. Built on [clap](https://docs.rs/clap) for parsing and
//! [serde](https://docs.rs/serde) for the configuration.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Default)]
//! struct Config { name: String, port: i64 }
//!
//! impl AppConfig for Config {}
//!
//! let root = Command::new("myapp")
//!     .local_flag(Flag::int("port", |c: &mut Config| &mut c.port).short('p'))
//!     .handler(|ctx, _| {
//!         println!("serving {} on {}", ctx.config().name, ctx.config().port);
//!         Ok(())
//!     });
//!
//! let mut config = Config::default();
//! App::new(root, &mut config).run(&ClapExecutor::new())?;
//! ```
//!
//! That call reads `./myapp.yaml` if it exists, applies `MYAPP_*`
//! environment variables, parses the command line and runs the handler with
//! the resolved config.
//!
//! # Layer precedence
//!
//! ```text
//! Defaults              whatever the struct held before run()
//!        ↑ overridden by
//! Config file           ./{app_name}.yaml, or .config_path()
//!        ↑ overridden by
//! Environment vars      {APP_NAME}_{FIELD_PATH}
//!        ↑ overridden by
//! Flags                 --name / -n, when given on the command line
//! ```
//!
//! Every layer is **sparse**: a file only needs the keys it changes, a
//! variable targets a single field, and a flag only counts when it is
//! actually passed. The config struct is updated in place, one layer at a
//! time, and a layer that fails to apply leaves it as it was.
//!
//! # Config file
//!
//! The file is YAML, looked up through the [`Filesystem`] carried by the
//! [`Context`]. Missing files are skipped unless
//! [`config_must_exist(true)`](App::config_must_exist) is set, in which case
//! the run fails with [`ClappError::ConfigNotFound`]. Nested mappings merge
//! key by key; sequences and scalars are replaced.
//!
//! # Environment variables
//!
//! With app name `myapp`, variables map onto the serialized field paths:
//!
//! | Env var | Config key |
//! |---------|------------|
//! | `MYAPP_PORT` | `port` |
//! | `MYAPP_DATABASE_URL` | `database.url` |
//!
//! Values are parsed according to the type the field already holds: a string
//! field takes the value verbatim, a bool accepts `true/false/1/0`, a list
//! splits on commas. A variable set to the empty string counts as set. Fields
//! that must come from the environment are listed by
//! [`AppConfig::required_env`].
//!
//! # Flags
//!
//! A [`Flag`] is bound to where its value goes: a field of the config
//! (`|c: &mut Config| &mut c.port`) or caller-owned storage
//! ([`Slot::Shared`]). The kind of the flag (string, string list, int, int
//! list, bool) follows from that binding. Persistent flags are inherited by
//! every descendant command; local flags stay on their own command.
//!
//! # Logging
//!
//! The framework logs through [`tracing`] and builds its own subscriber
//! ([`Logger`]); nothing is installed globally. Before the handler runs, the
//! config's [`log_level`](AppConfig::log_level) and
//! [`log_format`](AppConfig::log_format) are applied to that logger. By
//! default these read top-level `log_level` (integer) and `log_format`
//! (`console` or `json`) fields if the config has them.
//!
//! # Error handling
//!
//! All fallible operations return [`ClappError`]. Handlers return
//! `anyhow::Result<()>`; their errors come back as [`ClappError::Handler`].

pub mod error;
pub mod fs;
pub mod logger;
pub mod types;

mod app;
mod builder;
mod cli;
mod config;
mod context;
mod env;
mod file;
pub(crate) mod merge;

#[cfg(test)]
mod fixtures;

pub use app::App;
pub use builder::{CommandBuilder, build};
pub use cli::{ClapBuilder, ClapExecutor, Executor};
pub use config::{AppConfig, ConfigLoader};
pub use context::Context;
pub use error::{ClappError, EnvError};
pub use fs::{Filesystem, MemFs, OsFs};
pub use logger::{LogFormat, LogManager, Logger, update_logger_pre_run};
pub use types::{Command, Descriptions, Flag, FlagScope, Invocation, Slot, ValueKind, ValueRef};
