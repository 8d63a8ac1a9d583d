//! Process-wide cache of the enabled log levels
//!
//! `is_*_enabled` checks on the logging facade read a single atomic instead of taking the
//! dispatcher's snapshot lock. The global dispatcher stores into the cache whenever its
//! configuration changes, and a daemon thread resamples it once a second, so a reader may see
//! a value up to a second stale.

use super::log_level::LogLevel;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Once;
use std::thread;
use std::time::Duration;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Encodes "nothing enabled"; any value outside the level indices works.
const DISABLED: u8 = u8::MAX;

static FLOOR: AtomicU8 = AtomicU8::new(DISABLED);
static REFRESHER: Once = Once::new();

/// Store the lowest enabled level, or `None` when every level is disabled.
pub fn store(floor: Option<LogLevel>) {
    FLOOR.store(floor.map_or(DISABLED, |level| level as u8), Ordering::Relaxed);
}

pub fn floor() -> Option<LogLevel> {
    LogLevel::from_index(FLOOR.load(Ordering::Relaxed))
}

#[inline]
pub fn is_enabled(level: LogLevel) -> bool {
    floor().is_some_and(|floor| level >= floor)
}

/// Start the once-a-second resampling thread. Idempotent.
pub fn ensure_refresher<F>(sample: F)
where
    F: Fn() -> Option<LogLevel> + Send + 'static,
{
    REFRESHER.call_once(move || {
        store(sample());
        let spawned = thread::Builder::new()
            .name("micrologger-level-cache".to_string())
            .spawn(move || loop {
                thread::sleep(REFRESH_INTERVAL);
                store(sample());
            });
        if let Err(e) = spawned {
            eprintln!("[LOGGER ERROR] Failed to start level cache refresher: {}", e);
        }
    });
}
