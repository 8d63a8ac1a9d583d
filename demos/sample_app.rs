//! Walkthrough of the ways to set up logging
//!
//! Demonstrates logging before any setup, fixed targets, a watched configuration file, custom
//! targets (fixed and from configuration), and swapping the logger factory.
//!
//! Run with: cargo run --example sample_app

use micrologger::prelude::*;
use micrologger::{ConsoleLoggerFactory, NowhereLoggerFactory};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

struct SampleApp;

/// Prints the logger name padded to a column, then the message.
struct PaddedTarget {
    minimum_level: LogLevel,
    layout: Layout,
}

impl PaddedTarget {
    fn new(minimum_level: LogLevel, layout: Layout) -> Self {
        Self {
            minimum_level,
            layout,
        }
    }
}

impl Target for PaddedTarget {
    fn name(&self) -> &str {
        "padded"
    }

    fn minimum_level(&self) -> LogLevel {
        self.minimum_level
    }

    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn write(&self, event: &LogEvent, _flush_after_write: bool) -> Result<()> {
        let label = format!("PaddedTarget: [{}] ", event.logger);
        println!("{:<50}{}", label, event.message);
        Ok(())
    }
}

fn do_some_logging(heading: &str) {
    println!("\n{}\n", heading);

    let log = logger_for::<SampleApp>();
    log.debug("I'm debugging");
    log.info("I'm informing you");
    log.warn("I'm warning you...");
    log.error("I'm faulty. I err.");
    log.fatal("I failed completely!");
}

fn main() -> Result<()> {
    println!("=== MicroLogger - Sample Application ===");

    let dispatcher = OutputDispatcher::global();

    // Nothing is configured yet, so nothing is written.
    do_some_logging("1: No setup.");

    dispatcher.add_fixed_target(
        Arc::new(ConsoleTarget::new(LogLevel::Info, Layout::default())),
        false,
    );
    do_some_logging("2: Fixed targets.");

    // Targets from a configuration file come on top of the fixed ones. Edit the file while
    // the process runs and the new targets take over.
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("sample_app.config");
    let log_path = temp_dir.path().join("logs").join("sample_app.log");
    fs::write(
        &config_path,
        format!(
            r#"<configuration>
  <microlog>
    <target type="console" minlevel="warn" layout="[config] $level $logger: $message"/>
    <target type="mycustomtarget" minlevel="error"/>
  </microlog>
  <microlog async="true" asyncflushtime="100">
    <target type="file" minlevel="debug" layout="$time $level $message" file="{}"/>
  </microlog>
</configuration>"#,
            log_path.display()
        ),
    )?;
    dispatcher.attach_config_file(&config_path)?;
    do_some_logging("3: Targets from configuration file.");

    dispatcher.add_fixed_target(
        Arc::new(PaddedTarget::new(LogLevel::Info, Layout::default())),
        false,
    );
    do_some_logging("4: With custom fixed target.");

    // Registering a factory re-applies the attached file, so `mycustomtarget` lines now work.
    dispatcher.add_config_factory("mycustomtarget", |level, layout, _node| -> Arc<dyn Target> {
        Arc::new(PaddedTarget::new(level, layout))
    });
    do_some_logging("5: With custom target from configuration file.");

    // Give the async file target one flush cycle before reading it back.
    thread::sleep(Duration::from_millis(300));
    println!("\nAsync file target wrote:");
    print!("{}", fs::read_to_string(&log_path)?);

    // Bypass the dispatcher entirely with plain console loggers.
    set_factory(Some(Arc::new(ConsoleLoggerFactory)));
    do_some_logging("6: Console logger.");

    // Or switch logging off everywhere.
    set_factory(Some(Arc::new(NowhereLoggerFactory)));
    do_some_logging("7: Nowhere logger.");

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
