use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Executor;
use crate::config::{AppConfig, ConfigLoader, snapshot};
use crate::context::Context;
use crate::error::ClappError;
use crate::fs::Filesystem;
use crate::logger::Logger;
use crate::types::Command;

/// Entry point: a command tree plus the configuration it populates.
///
/// ```ignore
/// let mut config = MyConfig::default();
/// App::new(root, &mut config)
///     .config_path("/etc/myapp.yaml")
///     .run(&ClapExecutor::new())?;
/// ```
///
/// The app name defaults to the root command's name. It determines the
/// default config path (`./{app_name}.yaml`) and the environment variable
/// prefix (`{APP_NAME}_`).
pub struct App<'a, C: AppConfig> {
    root: Command<C>,
    config: &'a mut C,
    app_name: Option<String>,
    config_path: Option<PathBuf>,
    config_must_exist: bool,
    fs: Option<Arc<dyn Filesystem>>,
    logger: Logger,
    env_prefix: Option<String>,
    env_enabled: bool,
}

impl<'a, C: AppConfig> App<'a, C> {
    pub fn new(root: Command<C>, config: &'a mut C) -> Self {
        Self {
            root,
            config,
            app_name: None,
            config_path: None,
            config_must_exist: false,
            fs: None,
            logger: Logger::default(),
            env_prefix: None,
            env_enabled: true,
        }
    }

    /// Override the app name (default: the root command's name).
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Override the config file path (default: `./{app_name}.yaml`).
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Fail when the config file is missing (default: `false`).
    pub fn config_must_exist(mut self, must_exist: bool) -> Self {
        self.config_must_exist = must_exist;
        self
    }

    /// Read the config file through `fs` instead of the host filesystem.
    pub fn fs(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// The logger in effect until the configuration adjusts it.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Override the environment variable prefix (default: uppercased app name).
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Disable environment variable overrides.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    fn loader(&self, fs: Arc<dyn Filesystem>) -> ConfigLoader {
        let app_name = self.app_name.as_deref().unwrap_or(self.root.name());
        let mut loader = ConfigLoader::new(app_name, fs).must_exist(self.config_must_exist);
        if let Some(path) = &self.config_path {
            loader = loader.path(path);
        }
        if let Some(prefix) = &self.env_prefix {
            loader = loader.env_prefix(prefix);
        }
        if !self.env_enabled {
            loader = loader.no_env();
        }
        loader
    }

    /// Run with the process arguments.
    pub fn run(self, executor: &dyn Executor<C>) -> Result<(), ClappError> {
        self.run_from(executor, std::env::args_os())
    }

    /// Run with explicit arguments; the first one is the program name.
    ///
    /// Populates the configuration from the file, then the environment, then
    /// the command line, and runs the matched handler.
    pub fn run_from<I, T>(self, executor: &dyn Executor<C>, args: I) -> Result<(), ClappError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        snapshot(&*self.config)?;

        let base = Context::new()
            .with_filesystem(self.fs.clone())
            .with_logger(self.logger.clone());
        let loader = self.loader(base.fs_handle());

        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let Self { root, config, .. } = self;

        let dispatch = base.logger();
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!(path = %loader.config_path().display(), "resolved config path");
            loader.apply_file(config)?;
            loader.override_with_env(config)?;
            executor.execute(&root, &base, config, args)
        })
    }
}
