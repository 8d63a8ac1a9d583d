//! File target implementation

use super::file_backend::FileSinkBackend;
use crate::core::{ConfigNode, Layout, LogEvent, LogLevel, LoggerError, Result, Target};
use std::sync::Arc;

/// Appends rendered lines to a file whose path is itself a layout.
///
/// The path layout is rendered without an event, so it may use `$starttime`, `$version` or
/// `$time` (one file per second, which is rarely what you want) but not event fields.
pub struct FileTarget {
    minimum_level: LogLevel,
    layout: Layout,
    target_file: Layout,
    logger_lock: Option<String>,
    exceptions_only: bool,
    backend: Arc<FileSinkBackend>,
}

impl FileTarget {
    pub fn new(minimum_level: LogLevel, layout: Layout, target_file: Layout) -> Self {
        Self {
            minimum_level,
            layout,
            target_file,
            logger_lock: None,
            exceptions_only: false,
            backend: Arc::clone(FileSinkBackend::global()),
        }
    }

    /// Only write events from the logger with exactly this name.
    #[must_use]
    pub fn with_logger_lock(mut self, logger: impl Into<String>) -> Self {
        self.logger_lock = Some(logger.into());
        self
    }

    /// Only write events that carry an exception.
    #[must_use]
    pub fn with_exceptions_only(mut self, exceptions_only: bool) -> Self {
        self.exceptions_only = exceptions_only;
        self
    }

    /// Append through `backend` instead of the process-wide one.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<FileSinkBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Factory for `type="file"` lines: reads the `file` path layout and the optional
    /// `logger` lock. A line without a `file` path builds no target.
    pub fn from_config(minimum_level: LogLevel, layout: Layout, node: &ConfigNode) -> Option<Self> {
        let target = Self::new(minimum_level, layout, configured_path(node)?);
        Some(match node.attr("logger") {
            Some(logger) => target.with_logger_lock(logger),
            None => target,
        })
    }

    /// Factory for `type="exceptions"` lines: a file target that only takes events carrying
    /// an exception.
    pub fn exceptions_from_config(
        minimum_level: LogLevel,
        layout: Layout,
        node: &ConfigNode,
    ) -> Option<Self> {
        let target = Self::new(minimum_level, layout, configured_path(node)?);
        Some(target.with_exceptions_only(true))
    }

    pub fn logger_lock(&self) -> Option<&str> {
        self.logger_lock.as_deref()
    }

    pub fn is_exceptions_only(&self) -> bool {
        self.exceptions_only
    }

    pub fn target_file(&self) -> &Layout {
        &self.target_file
    }

    /// Whether the lock and exception filters let `event` through. The level gate is
    /// separate.
    pub fn admits(&self, event: &LogEvent) -> bool {
        if self.exceptions_only && event.exception.is_none() {
            return false;
        }
        match &self.logger_lock {
            Some(lock) => event.logger == *lock,
            None => true,
        }
    }
}

fn configured_path(node: &ConfigNode) -> Option<Layout> {
    match node.attr("file") {
        Some(file) if !file.trim().is_empty() => Some(Layout::compile(file)),
        _ => {
            eprintln!(
                "[LOGGER WARNING] {} target without a 'file' attribute, skipping it",
                node.attr_or("type", "file")
            );
            None
        }
    }
}

impl Target for FileTarget {
    fn name(&self) -> &str {
        "file"
    }

    fn minimum_level(&self) -> LogLevel {
        self.minimum_level
    }

    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn write(&self, event: &LogEvent, flush_after_write: bool) -> Result<()> {
        if !self.admits(event) {
            return Ok(());
        }

        let path = self.target_file.render(None);
        if path.is_empty() {
            return Err(LoggerError::file_sink(path, "file layout rendered an empty path"));
        }
        self.backend
            .write(&path, &self.layout.render(Some(event)), flush_after_write)
    }
}
