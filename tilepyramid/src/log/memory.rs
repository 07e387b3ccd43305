//! In-memory logger for tests.

use std::fmt::Arguments;
use std::sync::Mutex;

use super::{LogLevel, Logger};

/// Records every line it receives.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines, oldest first.
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Lines recorded at exactly `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: LogLevel, args: Arguments<'_>) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, args.to_string()));
    }
}
