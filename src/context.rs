//! The execution context threaded through the command tree.
//!
//! A [`Context`] carries the three ambient values a handler needs: the
//! filesystem, the log manager and a reference to the resolved
//! configuration. Contexts are immutable; each `with_*` call derives a new
//! one and keeps every value of its parent that it does not replace.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;
use std::sync::Arc;

use tracing::Dispatch;

use crate::fs::{Filesystem, OsFs};
use crate::logger::{LogManager, Logger};

/// Ambient values for one invocation.
///
/// `C` is the configuration type; a fresh context carries `()` until
/// [`with_config`](Context::with_config) attaches the real one.
pub struct Context<'c, C = ()> {
    fs: Arc<dyn Filesystem>,
    log: Rc<RefCell<LogManager>>,
    config: &'c C,
}

impl Context<'static, ()> {
    /// A context with the host filesystem and a default logger.
    pub fn new() -> Self {
        Self {
            fs: Arc::new(OsFs),
            log: Rc::new(RefCell::new(LogManager::new(Logger::default()))),
            config: &(),
        }
    }
}

impl Default for Context<'static, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'c, C> Context<'c, C> {
    /// Derive a context using `fs`, or the host filesystem when `None`.
    pub fn with_filesystem(&self, fs: Option<Arc<dyn Filesystem>>) -> Self {
        Self {
            fs: fs.unwrap_or_else(|| Arc::new(OsFs)),
            log: Rc::clone(&self.log),
            config: self.config,
        }
    }

    /// Derive a context with a fresh log manager for `logger`.
    pub fn with_logger(&self, logger: Logger) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            log: Rc::new(RefCell::new(LogManager::new(logger))),
            config: self.config,
        }
    }

    /// Derive a context carrying `config`. The log manager is shared with
    /// `self`, so changes made through either context are visible to both.
    pub fn with_config<'d, D>(&self, config: &'d D) -> Context<'d, D> {
        Context {
            fs: Arc::clone(&self.fs),
            log: Rc::clone(&self.log),
            config,
        }
    }

    pub fn fs(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    /// A shared handle to the filesystem.
    pub fn fs_handle(&self) -> Arc<dyn Filesystem> {
        Arc::clone(&self.fs)
    }

    /// Mutable access to the log manager.
    ///
    /// # Panics
    ///
    /// Panics if the log manager is already borrowed, e.g. when called again
    /// while a previous guard is still alive.
    pub fn log_manager(&self) -> RefMut<'_, LogManager> {
        self.log.borrow_mut()
    }

    /// The dispatch of the current logger.
    pub fn logger(&self) -> Dispatch {
        self.log.borrow().dispatch().clone()
    }

    pub fn config(&self) -> &'c C {
        self.config
    }
}
