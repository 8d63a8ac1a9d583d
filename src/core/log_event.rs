//! Log event structure

use super::log_level::LogLevel;

/// One emitted log record. Read-only once handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub logger: String,
    pub message: String,
    pub level: LogLevel,
    pub exception: Option<String>,
}

impl LogEvent {
    pub fn new(logger: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
            message: message.into(),
            level,
            exception: None,
        }
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }
}
