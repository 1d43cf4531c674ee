//! Logging module for the fieldcrypt library
//!
//! This module provides a simple logging interface with a focus on debug logging.
//! By default, logging is disabled and uses a no-op implementation.

use std::fmt;
use std::sync::RwLock;

/// Logger interface for the fieldcrypt library
pub trait Logger: Send + Sync {
    /// Log a debug message
    fn debug(&self, message: &str);

    /// Log a debug message with formatting
    fn debugf(&self, fmt: fmt::Arguments<'_>);
}

/// A no-op logger that does nothing
#[derive(Debug, Default)]
pub struct NoopLogger;

impl NoopLogger {
    /// Create a new no-op logger
    pub fn new() -> Self {
        Self
    }

    /// Create a boxed instance
    pub fn boxed() -> Box<dyn Logger> {
        Box::new(Self::new())
    }
}

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn debugf(&self, _fmt: fmt::Arguments<'_>) {}
}

// Global logger (default to noop)
static LOGGER: RwLock<Option<Box<dyn Logger>>> = RwLock::new(None);

/// Set the logger for the fieldcrypt library
pub fn set_logger(logger: Box<dyn Logger>) {
    let mut global_logger = LOGGER.write().unwrap();
    *global_logger = Some(logger);
}

/// Check if debug logging is enabled
pub fn debug_enabled() -> bool {
    let global_logger = LOGGER.read().unwrap();
    global_logger.is_some()
}

/// Log a debug message
pub fn debug(message: &str) {
    let global_logger = LOGGER.read().unwrap();
    if let Some(logger) = global_logger.as_ref() {
        logger.debug(message);
    }
}

/// Log a formatted debug message
pub fn debugf(args: fmt::Arguments<'_>) {
    let global_logger = LOGGER.read().unwrap();
    if let Some(logger) = global_logger.as_ref() {
        logger.debugf(args);
    }
}

/// Provides a simple logger that writes to standard output
#[derive(Debug, Default)]
pub struct StdoutLogger;

impl StdoutLogger {
    /// Create a new stdout logger
    pub fn new() -> Self {
        Self
    }

    /// Create a boxed instance
    pub fn boxed() -> Box<dyn Logger> {
        Box::new(Self::new())
    }
}

impl Logger for StdoutLogger {
    #[allow(clippy::print_stdout)]
    fn debug(&self, message: &str) {
        println!("[DEBUG] {}", message);
    }

    #[allow(clippy::print_stdout)]
    fn debugf(&self, fmt: fmt::Arguments<'_>) {
        println!("[DEBUG] {}", fmt);
    }
}
