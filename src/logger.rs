//! Logging Capability
//!
//! The engine never talks to a logging backend directly. It emits leveled
//! messages through the [`Logger`] trait, which callers can implement to route
//! output wherever they need. [`DefaultLogger`] forwards to the `log` facade.

use std::fmt;
use std::sync::Arc;

use log::Level;
use once_cell::sync::Lazy;

/// Target used for records forwarded by [`DefaultLogger`].
pub const LOG_TARGET: &str = "stagerunner";

/// Leveled message sink consumed by the engine and by actions.
pub trait Logger: Send + Sync {
    /// Emits a single message at `level`.
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

/// Forwards every message to the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLogger;

impl DefaultLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for DefaultLogger {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "{}", args);
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}

static DEFAULT_LOGGER: Lazy<Arc<DefaultLogger>> = Lazy::new(|| Arc::new(DefaultLogger));

/// Returns the shared default logger instance.
pub fn default_logger() -> Arc<dyn Logger> {
    let logger: Arc<DefaultLogger> = Arc::clone(&DEFAULT_LOGGER);
    logger
}
