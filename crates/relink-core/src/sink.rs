//! Migration log implementations shipped with the core crate.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::traits::{LogTone, MigrationLog};

/// Forwards migration log lines to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl MigrationLog for TracingLog {
    fn write(&self, message: &str, tone: LogTone) {
        match tone {
            LogTone::Plain => info!(subsystem = "migration", "{}", message),
            LogTone::Success => info!(subsystem = "migration", success = true, "{}", message),
            LogTone::Error => error!(subsystem = "migration", success = false, "{}", message),
        }
    }
}

/// A recorded migration log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub message: String,
    pub tone: LogTone,
}

/// Keeps every line in memory. Used by tests and by report rendering.
#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: RefCell<Vec<LogLine>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.borrow().clone()
    }

    /// Messages of lines written with [`LogTone::Error`].
    pub fn errors(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|line| line.tone == LogTone::Error)
            .map(|line| line.message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .borrow()
            .iter()
            .any(|line| line.message.contains(needle))
    }
}

impl MigrationLog for RecordingLog {
    fn write(&self, message: &str, tone: LogTone) {
        self.lines.borrow_mut().push(LogLine {
            message: message.to_string(),
            tone,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_log_keeps_order_and_tone() {
        let log = RecordingLog::new();
        log.write("Preparing to migrate field “cta”.", LogTone::Plain);
        log.write("    > Unable to convert content #4 for element #9", LogTone::Error);
        log.write("    > Field “cta” migrated.", LogTone::Success);

        let lines = log.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].tone, LogTone::Error);
        assert_eq!(log.errors(), vec!["    > Unable to convert content #4 for element #9"]);
        assert!(log.contains("migrated"));
    }
}
