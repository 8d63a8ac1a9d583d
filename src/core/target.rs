//! Target trait for log output destinations

use super::{error::Result, layout::Layout, log_event::LogEvent, log_level::LogLevel};

/// A configured sink with a minimum level and a layout.
///
/// Targets live in shared snapshots and are written from the caller's thread (synchronous
/// targets) or the flush loop (asynchronous targets), so `write` takes `&self`; keep any mutable
/// sink state behind a lock.
///
/// # Example
///
/// ```
/// use micrologger::{Layout, LogEvent, LogLevel, Result, Target};
///
/// struct StderrTarget {
///     minimum_level: LogLevel,
///     layout: Layout,
/// }
///
/// impl Target for StderrTarget {
///     fn name(&self) -> &str {
///         "stderr"
///     }
///
///     fn minimum_level(&self) -> LogLevel {
///         self.minimum_level
///     }
///
///     fn layout(&self) -> &Layout {
///         &self.layout
///     }
///
///     fn write(&self, event: &LogEvent, _flush_after_write: bool) -> Result<()> {
///         eprintln!("{}", self.layout.render(Some(event)));
///         Ok(())
///     }
/// }
/// ```
pub trait Target: Send + Sync {
    fn name(&self) -> &str;

    fn minimum_level(&self) -> LogLevel;

    fn layout(&self) -> &Layout;

    /// Sink-specific write, called only for admitted events.
    fn write(&self, event: &LogEvent, flush_after_write: bool) -> Result<()>;

    /// Write `event` iff `event.level >= self.minimum_level()`.
    fn conditional_write(&self, event: &LogEvent, flush_after_write: bool) -> Result<()> {
        if event.level >= self.minimum_level() {
            self.write(event, flush_after_write)
        } else {
            Ok(())
        }
    }
}
