//! Logging macros for ergonomic log message formatting.
//!
//! These macros check that the level is enabled before formatting, so arguments to a disabled
//! `trace!` cost nothing beyond the check. They accept anything that implements
//! [`Log`](crate::Log), including the `Arc<dyn Log>` returned by [`logger`](crate::logger).
//!
//! # Examples
//!
//! ```
//! use micrologger::{info, error};
//!
//! let log = micrologger::logger("server");
//!
//! // Basic logging
//! info!(log, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(log, "Server listening on port {}", port);
//!
//! // Carrying an error into the event's exception field
//! let err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
//! error!(log, exception = err, "Bind failed on {}", port);
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// use micrologger::{log, LogLevel};
/// let logger = micrologger::logger("app");
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, exception = $exception:expr, $($arg:tt)+) => {{
        use $crate::Log as _;
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            logger.log(level, format!($($arg)+), Some(($exception).to_string()));
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        use $crate::Log as _;
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            logger.log(level, format!($($arg)+), None);
        }
    }};
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// use micrologger::debug;
/// let logger = micrologger::logger("app");
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// use micrologger::warn;
/// let logger = micrologger::logger("app");
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
