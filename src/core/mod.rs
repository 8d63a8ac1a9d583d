//! Core logging types: events, levels, layouts, configuration and the output dispatcher

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod layout;
pub mod level_cache;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod target;
pub mod timestamp;
pub mod watcher;

pub use config::{ConfigBlock, ConfigNode};
pub use dispatcher::{EnabledLevels, OutputDispatcher, TargetFactory};
pub use error::{LoggerError, Result};
pub use layout::{register_part, set_version, Layout, Part, RenderPart};
pub use log_event::LogEvent;
pub use log_level::LogLevel;
pub use logger::{
    logger, logger_for, set_factory, ConsoleLogger, ConsoleLoggerFactory, Log, LoggerFactory,
    MicroLogger, MicroLoggerFactory, NowhereLogger, NowhereLoggerFactory,
};
pub use metrics::LoggerMetrics;
pub use target::Target;
pub use watcher::{ConfigChange, ConfigWatcher};
