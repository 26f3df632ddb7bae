//! Logger capability used by the monitor for state-change and tap messages.

use std::sync::{Mutex, PoisonError};

/// Sink for the monitor's human-readable messages.
///
/// Implementations must not panic: the monitor calls them from panic hooks.
pub trait HealthLogger: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default logger, forwarding to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl HealthLogger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "vitals::health", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "vitals::health", "{}", message);
    }
}

/// Severity of a captured message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warn,
    Error,
}

/// Logger that keeps every message in memory.
///
/// Handy for hosts that surface monitor messages elsewhere, and for tests.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything logged so far, oldest first.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged at the given level.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

impl HealthLogger for MemoryLogger {
    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}
