//! # MicroLogger
//!
//! A small pluggable logging framework. Events from named loggers pass through one
//! [`OutputDispatcher`], which fans them out to console, file and user-defined targets. The set
//! of targets can be built in code or read from an XML configuration file that is watched and
//! re-applied while the process runs.
//!
//! ## Features
//!
//! - **Live configuration**: edit the config file and the new targets take over atomically
//! - **Sync and async targets**: async targets are flushed in batches from a background thread
//! - **Layouts**: `$time`, `$level`, `$logger`, `$message`, `$exception` and user-registered parts
//! - **Failure isolation**: a failing or panicking target never affects the others
//!
//! ## Example
//!
//! ```
//! use micrologger::prelude::*;
//! use std::sync::Arc;
//!
//! let dispatcher = OutputDispatcher::global();
//! dispatcher.add_fixed_target(
//!     Arc::new(ConsoleTarget::new(LogLevel::Info, Layout::compile("$level $logger: $message"))),
//!     false,
//! );
//!
//! let log = micrologger::logger("startup");
//! log.info("ready");
//! ```

pub mod core;
pub mod macros;
pub mod targets;

pub mod prelude {
    pub use crate::core::{
        logger, logger_for, set_factory, ConfigNode, Layout, Log, LogEvent, LogLevel,
        LoggerError, LoggerFactory, LoggerMetrics, OutputDispatcher, Result, Target,
    };
    pub use crate::targets::{ConsoleTarget, FileTarget};
}

pub use crate::core::{
    logger, logger_for, register_part, set_factory, set_version, ConfigBlock, ConfigChange,
    ConfigNode, ConfigWatcher, ConsoleLogger, ConsoleLoggerFactory, EnabledLevels, Layout, Log,
    LogEvent, LogLevel, LoggerError, LoggerFactory, LoggerMetrics, MicroLogger,
    MicroLoggerFactory, NowhereLogger, NowhereLoggerFactory, OutputDispatcher, Part, RenderPart,
    Result, Target, TargetFactory,
};
pub use targets::{ConsoleTarget, FileSinkBackend, FileTarget};
