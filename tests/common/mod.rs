//! Shared helpers for integration tests

#![allow(dead_code)]

use micrologger::{ConfigNode, Layout, LogEvent, LogLevel, Result, Target};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type Lines = Arc<Mutex<Vec<String>>>;

/// Target that renders into a shared in-memory list.
pub struct MemoryTarget {
    minimum_level: LogLevel,
    layout: Layout,
    lines: Lines,
    flushes: Arc<Mutex<Vec<bool>>>,
}

impl MemoryTarget {
    pub fn new(minimum_level: LogLevel, layout: Layout, lines: Lines) -> Self {
        Self {
            minimum_level,
            layout,
            lines,
            flushes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn flushes(&self) -> Vec<bool> {
        self.flushes.lock().clone()
    }
}

impl Target for MemoryTarget {
    fn name(&self) -> &str {
        "memory"
    }

    fn minimum_level(&self) -> LogLevel {
        self.minimum_level
    }

    fn layout(&self) -> &Layout {
        &self.layout
    }

    fn write(&self, event: &LogEvent, flush_after_write: bool) -> Result<()> {
        self.lines.lock().push(self.layout.render(Some(event)));
        self.flushes.lock().push(flush_after_write);
        Ok(())
    }
}

pub fn lines() -> Lines {
    Arc::new(Mutex::new(Vec::new()))
}

/// Config factory building memory targets that all append to `lines`.
pub fn memory_factory(
    lines: Lines,
) -> impl Fn(LogLevel, Layout, &ConfigNode) -> Arc<dyn Target> + Send + Sync + 'static {
    move |level: LogLevel, layout: Layout, _node: &ConfigNode| -> Arc<dyn Target> {
        Arc::new(MemoryTarget::new(level, layout, Arc::clone(&lines)))
    }
}

pub fn snapshot(lines: &Lines) -> Vec<String> {
    lines.lock().clone()
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}
