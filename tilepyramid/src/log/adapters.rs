//! Production and silent logger implementations.

use std::fmt::Arguments;

use super::{LogLevel, Logger};

/// Forwards lines to the `tracing` crate.
///
/// Each event carries a `component` field so output from the orchestrator
/// and the individual workers can be told apart.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    component: &'static str,
}

impl TracingLogger {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("tilepyramid")
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        let component = self.component;
        match level {
            LogLevel::Trace => tracing::trace!(component, "{}", args),
            LogLevel::Debug => tracing::debug!(component, "{}", args),
            LogLevel::Info => tracing::info!(component, "{}", args),
            LogLevel::Warn => tracing::warn!(component, "{}", args),
            LogLevel::Error => tracing::error!(component, "{}", args),
        }
    }
}

/// Discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    #[inline]
    fn log(&self, _level: LogLevel, _args: Arguments<'_>) {}
}
