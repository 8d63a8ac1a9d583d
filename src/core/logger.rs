//! Logging facade
//!
//! Application code obtains a named [`Log`] handle with [`logger`] or [`logger_for`] and calls
//! the per-level methods on it. Which implementation backs the handle is decided by the
//! process-wide [`LoggerFactory`]: by default every handle forwards to the global
//! [`OutputDispatcher`], but the factory can be swapped for [`ConsoleLoggerFactory`] or
//! [`NowhereLoggerFactory`] with [`set_factory`].

use super::dispatcher::OutputDispatcher;
use super::level_cache;
use super::log_event::LogEvent;
use super::log_level::LogLevel;
use crate::targets::console::write_line;
use parking_lot::RwLock;
use std::fmt::Display;
use std::io;
use std::sync::{Arc, OnceLock};

/// A named logger.
///
/// Only [`Log::name`], [`Log::is_enabled`] and [`Log::log`] are required; everything else is
/// a convenience over them. The `is_*_enabled` checks are meant for skipping expensive message
/// formatting and may lag a configuration change by up to a second.
pub trait Log: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self, level: LogLevel) -> bool;

    /// Emit one event. Never fails.
    fn log(&self, level: LogLevel, message: String, exception: Option<String>);

    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message.to_string(), None);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message.to_string(), None);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message.to_string(), None);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message.to_string(), None);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message.to_string(), None);
    }

    fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, message.to_string(), None);
    }

    fn trace_exception(&self, message: &str, error: &dyn Display) {
        self.log(LogLevel::Trace, message.to_string(), Some(error.to_string()));
    }

    fn debug_exception(&self, message: &str, error: &dyn Display) {
        self.log(LogLevel::Debug, message.to_string(), Some(error.to_string()));
    }

    fn info_exception(&self, message: &str, error: &dyn Display) {
        self.log(LogLevel::Info, message.to_string(), Some(error.to_string()));
    }

    fn warn_exception(&self, message: &str, error: &dyn Display) {
        self.log(LogLevel::Warn, message.to_string(), Some(error.to_string()));
    }

    fn error_exception(&self, message: &str, error: &dyn Display) {
        self.log(LogLevel::Error, message.to_string(), Some(error.to_string()));
    }

    fn fatal_exception(&self, message: &str, error: &dyn Display) {
        self.log(LogLevel::Fatal, message.to_string(), Some(error.to_string()));
    }

    fn is_trace_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Trace)
    }

    fn is_debug_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Debug)
    }

    fn is_info_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Info)
    }

    fn is_warn_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Warn)
    }

    fn is_error_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Error)
    }

    fn is_fatal_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Fatal)
    }
}

/// Strategy for creating loggers by name.
pub trait LoggerFactory: Send + Sync {
    fn create(&self, name: &str) -> Arc<dyn Log>;
}

fn factory_slot() -> &'static RwLock<Arc<dyn LoggerFactory>> {
    static FACTORY: OnceLock<RwLock<Arc<dyn LoggerFactory>>> = OnceLock::new();
    FACTORY.get_or_init(|| RwLock::new(Arc::new(MicroLoggerFactory::new())))
}

/// Replace the process-wide logger factory. `None` is ignored and the current factory kept.
///
/// Loggers already handed out keep their original implementation.
pub fn set_factory(factory: Option<Arc<dyn LoggerFactory>>) {
    if let Some(factory) = factory {
        *factory_slot().write() = factory;
    }
}

/// A logger with the given name from the current factory.
///
/// # Example
///
/// ```
/// let log = micrologger::logger("billing");
/// log.info("invoice sent");
/// if log.is_debug_enabled() {
///     log.debug(&format!("payload: {:?}", [1, 2, 3]));
/// }
/// ```
pub fn logger(name: &str) -> Arc<dyn Log> {
    let factory = Arc::clone(&*factory_slot().read());
    factory.create(name)
}

/// A logger named after the type `T`, e.g. `my_app::db::Pool`.
pub fn logger_for<T: ?Sized>() -> Arc<dyn Log> {
    logger(std::any::type_name::<T>())
}

/// Forwards every event to an [`OutputDispatcher`], the global one unless told otherwise.
pub struct MicroLogger {
    name: String,
    dispatcher: Option<OutputDispatcher>,
}

impl MicroLogger {
    pub fn new(name: impl Into<String>) -> Self {
        level_cache::ensure_refresher(|| OutputDispatcher::global().enabled_levels().floor());
        Self {
            name: name.into(),
            dispatcher: None,
        }
    }

    pub fn with_dispatcher(name: impl Into<String>, dispatcher: OutputDispatcher) -> Self {
        Self {
            name: name.into(),
            dispatcher: Some(dispatcher),
        }
    }

    fn dispatcher(&self) -> &OutputDispatcher {
        self.dispatcher
            .as_ref()
            .unwrap_or_else(|| OutputDispatcher::global())
    }
}

impl Log for MicroLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.is_enabled(level),
            None => level_cache::is_enabled(level),
        }
    }

    fn log(&self, level: LogLevel, message: String, exception: Option<String>) {
        // Targets do the level filtering, so a stale enabled flag never loses an event.
        let event = LogEvent {
            logger: self.name.clone(),
            message,
            level,
            exception,
        };
        self.dispatcher().write(event);
    }
}

#[derive(Default)]
pub struct MicroLoggerFactory {
    dispatcher: Option<OutputDispatcher>,
}

impl MicroLoggerFactory {
    /// Loggers writing to the global dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loggers writing to `dispatcher`.
    pub fn with_dispatcher(dispatcher: OutputDispatcher) -> Self {
        Self {
            dispatcher: Some(dispatcher),
        }
    }
}

impl LoggerFactory for MicroLoggerFactory {
    fn create(&self, name: &str) -> Arc<dyn Log> {
        match &self.dispatcher {
            Some(dispatcher) => Arc::new(MicroLogger::with_dispatcher(name, dispatcher.clone())),
            None => Arc::new(MicroLogger::new(name)),
        }
    }
}

/// Prints straight to stdout, bypassing the dispatcher. Info and above are enabled.
pub struct ConsoleLogger {
    name: String,
    prefix: String,
    use_colors: bool,
}

impl ConsoleLogger {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let prefix = if name.is_empty() {
            String::new()
        } else {
            format!("{}: ", name)
        };
        Self {
            name,
            prefix,
            use_colors: true,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn format_line(&self, message: &str, exception: Option<&str>) -> String {
        match exception {
            Some(exception) => format!("{}{}\n{}", self.prefix, message, exception),
            None => format!("{}{}", self.prefix, message),
        }
    }
}

impl Log for ConsoleLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= LogLevel::Info
    }

    fn log(&self, level: LogLevel, message: String, exception: Option<String>) {
        if !self.is_enabled(level) {
            return;
        }
        let line = self.format_line(&message, exception.as_deref());
        let color = (self.use_colors && colored::control::SHOULD_COLORIZE.should_colorize())
            .then(|| level.color_code());
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = write_line(&mut lock, color, &line, true) {
            eprintln!("[LOGGER ERROR] Console logger failed: {}", e);
        }
    }
}

pub struct ConsoleLoggerFactory;

impl LoggerFactory for ConsoleLoggerFactory {
    fn create(&self, name: &str) -> Arc<dyn Log> {
        Arc::new(ConsoleLogger::new(name))
    }
}

/// Discards everything. Every level reports disabled.
pub struct NowhereLogger {
    name: String,
}

impl NowhereLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Log for NowhereLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }

    fn log(&self, _level: LogLevel, _message: String, _exception: Option<String>) {}
}

pub struct NowhereLoggerFactory;

impl LoggerFactory for NowhereLoggerFactory {
    fn create(&self, name: &str) -> Arc<dyn Log> {
        Arc::new(NowhereLogger::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Layout, Result, Target};
    use parking_lot::Mutex;

    struct Capture {
        layout: Layout,
        events: Mutex<Vec<LogEvent>>,
    }

    impl Target for Capture {
        fn name(&self) -> &str {
            "capture"
        }

        fn minimum_level(&self) -> LogLevel {
            LogLevel::Trace
        }

        fn layout(&self) -> &Layout {
            &self.layout
        }

        fn write(&self, event: &LogEvent, _flush_after_write: bool) -> Result<()> {
            self.events.lock().push(event.clone());
            Ok(())
        }
    }

    fn capture() -> (OutputDispatcher, Arc<Capture>) {
        let dispatcher = OutputDispatcher::new();
        let capture = Arc::new(Capture {
            layout: Layout::default(),
            events: Mutex::new(Vec::new()),
        });
        dispatcher.add_fixed_target(capture.clone(), false);
        (dispatcher, capture)
    }

    #[test]
    fn test_micro_logger_builds_events() {
        let (dispatcher, capture) = capture();
        let log = MicroLogger::with_dispatcher("orders", dispatcher);

        log.info("placed");
        log.warn_exception("retrying", &"timeout after 5s");

        let events = capture.events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], LogEvent::new("orders", LogLevel::Info, "placed"));
        assert_eq!(
            events[1],
            LogEvent::new("orders", LogLevel::Warn, "retrying").with_exception("timeout after 5s")
        );
    }

    #[test]
    fn test_exception_variants_keep_their_level() {
        let (dispatcher, capture) = capture();
        let log = MicroLogger::with_dispatcher("svc", dispatcher);
        let error = io::Error::new(io::ErrorKind::NotFound, "missing");

        log.trace_exception("t", &error);
        log.debug_exception("d", &error);
        log.info_exception("i", &error);
        log.error_exception("e", &error);
        log.fatal_exception("f", &error);

        let levels: Vec<LogLevel> = capture.events.lock().iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Trace,
                LogLevel::Debug,
                LogLevel::Info,
                LogLevel::Error,
                LogLevel::Fatal
            ]
        );
        assert!(capture
            .events
            .lock()
            .iter()
            .all(|e| e.exception.as_deref() == Some("missing")));
    }

    #[test]
    fn test_micro_logger_enabled_follows_dispatcher() {
        let (dispatcher, _capture) = capture();
        let log = MicroLogger::with_dispatcher("x", dispatcher);
        assert!(log.is_trace_enabled());
        assert!(log.is_fatal_enabled());

        let empty = MicroLogger::with_dispatcher("y", OutputDispatcher::new());
        assert!(!empty.is_fatal_enabled());
    }

    #[test]
    fn test_console_logger_format() {
        let named = ConsoleLogger::new("db");
        assert_eq!(named.format_line("up", None), "db: up");
        assert_eq!(named.format_line("down", Some("refused")), "db: down\nrefused");
        assert_eq!(ConsoleLogger::new("").format_line("bare", None), "bare");
    }

    #[test]
    fn test_console_logger_levels() {
        let log = ConsoleLogger::new("c").with_colors(false);
        assert!(!log.is_trace_enabled());
        assert!(!log.is_debug_enabled());
        assert!(log.is_info_enabled());
        assert!(log.is_fatal_enabled());
    }

    #[test]
    fn test_nowhere_logger() {
        let log = NowhereLoggerFactory.create("void");
        assert_eq!(log.name(), "void");
        assert!(LogLevel::ALL.iter().all(|level| !log.is_enabled(*level)));
        log.fatal("goes nowhere");
    }

    #[test]
    fn test_set_factory_ignores_none() {
        set_factory(Some(Arc::new(NowhereLoggerFactory)));
        set_factory(None);
        assert!(!logger("kept").is_fatal_enabled());

        set_factory(Some(Arc::new(ConsoleLoggerFactory)));
        assert!(logger_for::<String>().is_info_enabled());
        assert_eq!(logger_for::<String>().name(), "alloc::string::String");

        set_factory(Some(Arc::new(MicroLoggerFactory::new())));
    }
}
