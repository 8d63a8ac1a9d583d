//! Output dispatcher
//!
//! The single entry point every event passes through. The dispatcher holds an immutable
//! snapshot of the active targets, split into synchronous and asynchronous lists, and replaces
//! it wholesale whenever targets are added or the configuration is reloaded, so a writer always
//! sees either the old or the new complete list.
//!
//! Synchronous targets are written on the caller's thread, flushing after every event.
//! Events for asynchronous targets are queued and drained by a single background flush loop
//! every `asyncflushtime` milliseconds; within a drained batch only each target's last write
//! asks for a flush.
//!
//! Configuration comes from code ([`OutputDispatcher::add_fixed_target`],
//! [`OutputDispatcher::apply_config`]) or from an XML file that is watched and re-read on every
//! change ([`OutputDispatcher::attach_config_file`]). A reload either installs a complete new
//! snapshot or leaves the previous one in place.

use super::config::{self, ConfigNode, DEFAULT_ASYNC_FLUSH_MS};
use super::error::{LoggerError, Result};
use super::layout::Layout;
use super::level_cache;
use super::log_event::LogEvent;
use super::log_level::LogLevel;
use super::metrics::LoggerMetrics;
use super::target::Target;
use super::watcher::ConfigWatcher;
use crate::targets::{ConsoleTarget, FileTarget};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Reparses closer together than this are treated as duplicate notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(5);

/// Environment variable naming the configuration file for [`OutputDispatcher::attach_default_config`].
pub const CONFIG_ENV_VAR: &str = "MICROLOG_CONFIG";

/// Constructs a target from a configuration line's minimum level, compiled layout and raw node.
/// `None` skips the line.
pub type TargetFactory =
    Arc<dyn Fn(LogLevel, Layout, &ConfigNode) -> Option<Arc<dyn Target>> + Send + Sync>;

/// Which levels currently have at least one target that may accept them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnabledLevels {
    floor: Option<LogLevel>,
}

impl EnabledLevels {
    pub const NONE: EnabledLevels = EnabledLevels { floor: None };

    pub fn from_floor(floor: LogLevel) -> Self {
        Self { floor: Some(floor) }
    }

    pub fn floor(&self) -> Option<LogLevel> {
        self.floor
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.floor.is_some_and(|floor| level >= floor)
    }

    #[must_use]
    fn lowered_to(self, level: LogLevel) -> Self {
        Self {
            floor: Some(self.floor.map_or(level, |floor| floor.min(level))),
        }
    }
}

#[derive(Clone)]
struct Snapshot {
    sync_targets: Vec<Arc<dyn Target>>,
    async_targets: Vec<Arc<dyn Target>>,
    enabled: EnabledLevels,
    flush_interval: Duration,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            sync_targets: Vec::new(),
            async_targets: Vec::new(),
            enabled: EnabledLevels::NONE,
            flush_interval: Duration::from_millis(DEFAULT_ASYNC_FLUSH_MS),
        }
    }
}

#[derive(Default)]
struct FixedTargets {
    sync_targets: Vec<Arc<dyn Target>>,
    async_targets: Vec<Arc<dyn Target>>,
    /// Generation of the last installed reload.
    installed_generation: u64,
}

struct ConfigSource {
    path: PathBuf,
    _watcher: ConfigWatcher,
}

struct DispatcherInner {
    snapshot: RwLock<Arc<Snapshot>>,
    pending: Mutex<Vec<LogEvent>>,
    /// Keeps drained batches in order when a manual flush races the flush loop.
    flush_lock: Mutex<()>,
    factories: RwLock<HashMap<String, TargetFactory>>,
    /// Also serializes every snapshot replacement.
    fixed: Mutex<FixedTargets>,
    config: Mutex<Option<ConfigSource>>,
    last_parse: Mutex<Option<Instant>>,
    debounce: Duration,
    flush_started: AtomicBool,
    /// Handed out to reloads in start order; a reload older than the installed one is dropped.
    generation: AtomicU64,
    metrics: LoggerMetrics,
    is_global: bool,
    weak_self: Weak<DispatcherInner>,
}

/// Handle to a dispatcher. Clones share the same state.
#[derive(Clone)]
pub struct OutputDispatcher {
    inner: Arc<DispatcherInner>,
}

impl OutputDispatcher {
    /// The process-wide dispatcher the logging facade writes to.
    pub fn global() -> &'static OutputDispatcher {
        static GLOBAL: OnceLock<OutputDispatcher> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::build(DEFAULT_DEBOUNCE, true))
    }

    /// An isolated dispatcher with the built-in `console`, `file` and `exceptions` factories.
    #[must_use]
    pub fn new() -> Self {
        Self::build(DEFAULT_DEBOUNCE, false)
    }

    /// An isolated dispatcher with a custom reparse debounce window.
    #[must_use]
    pub fn with_debounce(debounce: Duration) -> Self {
        Self::build(debounce, false)
    }

    fn build(debounce: Duration, is_global: bool) -> Self {
        let inner = Arc::new_cyclic(|weak_self| DispatcherInner {
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            pending: Mutex::new(Vec::new()),
            flush_lock: Mutex::new(()),
            factories: RwLock::new(builtin_factories()),
            fixed: Mutex::new(FixedTargets::default()),
            config: Mutex::new(None),
            last_parse: Mutex::new(None),
            debounce,
            flush_started: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            metrics: LoggerMetrics::new(),
            is_global,
            weak_self: weak_self.clone(),
        });
        Self { inner }
    }

    /// Fan `event` out to every synchronous target and queue it for the asynchronous ones.
    ///
    /// Never blocks on asynchronous target I/O and never fails; a target that errors or panics
    /// loses this event and the rest still receive it.
    pub fn write(&self, event: LogEvent) {
        self.inner.write(event);
    }

    /// Add a target that stays active across every configuration reload.
    pub fn add_fixed_target(&self, target: Arc<dyn Target>, is_async: bool) {
        self.inner.add_fixed_target(target, is_async);
    }

    /// Register (or replace) the factory for configuration lines with `type="name"`.
    ///
    /// With a configuration file attached, the file is re-applied right away so the factory
    /// takes effect without waiting for the next change.
    ///
    /// # Example
    ///
    /// ```
    /// use micrologger::{ConsoleTarget, OutputDispatcher, Target};
    /// use std::sync::Arc;
    ///
    /// let dispatcher = OutputDispatcher::new();
    /// dispatcher.add_config_factory("plain", |level, layout, _node| -> Arc<dyn Target> {
    ///     Arc::new(ConsoleTarget::new(level, layout).with_colors(false))
    /// });
    /// dispatcher
    ///     .apply_config(r#"<microlog><target type="plain" minlevel="info"/></microlog>"#)
    ///     .unwrap();
    /// assert_eq!(dispatcher.sync_target_count(), 1);
    /// ```
    pub fn add_config_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(LogLevel, Layout, &ConfigNode) -> Arc<dyn Target> + Send + Sync + 'static,
    {
        let wrapped: TargetFactory =
            Arc::new(move |level: LogLevel, layout: Layout, node: &ConfigNode| {
                Some(factory(level, layout, node))
            });
        self.inner.factories.write().insert(name.into(), wrapped);
        if self.config_path().is_some() {
            let _ = self.inner.reload(false);
        }
    }

    /// Apply the file at `path` now and re-apply it whenever it is created, modified,
    /// renamed or deleted. Replaces any previously attached file.
    ///
    /// Fails if the file does not exist or cannot be watched; nothing changes in that case.
    /// If the file exists but cannot be applied, it stays attached (a later fix on disk is
    /// picked up) and the error is returned.
    pub fn attach_config_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(LoggerError::config(
                "config file",
                format!("'{}' does not exist", path.display()),
            ));
        }

        let weak = self.inner.weak_self.clone();
        let watcher = ConfigWatcher::spawn(&path, move |_change| {
            if let Some(inner) = weak.upgrade() {
                let _ = inner.reload(true);
            }
        })?;

        let previous = self.inner.config.lock().replace(ConfigSource {
            path,
            _watcher: watcher,
        });
        drop(previous);

        self.inner.reload(false)
    }

    /// Attach the file named by `MICROLOG_CONFIG`, or `<executable>.config` by default.
    pub fn attach_default_config(&self) -> Result<()> {
        self.attach_config_file(default_config_path()?)
    }

    /// Re-read and apply the attached configuration file, bypassing the debounce window.
    pub fn reparse(&self) -> Result<()> {
        self.inner.reload(false)
    }

    /// Apply a configuration document, replacing all configured (non-fixed) targets.
    ///
    /// On error the active targets are left untouched.
    pub fn apply_config(&self, xml: &str) -> Result<()> {
        self.inner.apply_config(xml)
    }

    /// Drain the async queue to the asynchronous targets now. Returns the number of events
    /// drained.
    pub fn flush_pending(&self) -> usize {
        self.inner.flush_pending()
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.inner.config.lock().as_ref().map(|source| source.path.clone())
    }

    pub fn enabled_levels(&self) -> EnabledLevels {
        self.inner.snapshot().enabled
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.enabled_levels().is_enabled(level)
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Trace)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Debug)
    }

    pub fn is_info_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Info)
    }

    pub fn is_warn_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Warn)
    }

    pub fn is_error_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Error)
    }

    pub fn is_fatal_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Fatal)
    }

    /// Current async flush interval.
    pub fn flush_interval(&self) -> Duration {
        self.inner.snapshot().flush_interval
    }

    pub fn sync_target_count(&self) -> usize {
        self.inner.snapshot().sync_targets.len()
    }

    pub fn async_target_count(&self) -> usize {
        self.inner.snapshot().async_targets.len()
    }

    /// Names of the active targets, synchronous first.
    pub fn target_names(&self) -> Vec<String> {
        let snapshot = self.inner.snapshot();
        snapshot
            .sync_targets
            .iter()
            .chain(snapshot.async_targets.iter())
            .map(|target| target.name().to_string())
            .collect()
    }

    /// Events queued for the next flush cycle.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.metrics
    }

    pub fn is_global(&self) -> bool {
        self.inner.is_global
    }
}

impl Default for OutputDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherInner {
    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.read())
    }

    fn write(&self, event: LogEvent) {
        let snapshot = self.snapshot();
        self.metrics.record_written();

        if !snapshot.async_targets.is_empty() {
            self.pending.lock().push(event.clone());
        }

        for target in &snapshot.sync_targets {
            self.deliver(target.as_ref(), &event, true);
        }
    }

    /// Write to one target, isolating its errors and panics from everyone else.
    fn deliver(&self, target: &dyn Target, event: &LogEvent, flush_after_write: bool) {
        let result = catch_unwind(AssertUnwindSafe(|| {
            target.conditional_write(event, flush_after_write)
        }));

        let error = match result {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(panic_info) => LoggerError::target_panicked(target.name(), panic_message(&panic_info)),
        };

        // Report the first failure and every 1000th after that.
        let previous = self.metrics.record_dropped();
        if previous == 0 || (previous + 1) % 1000 == 0 {
            eprintln!(
                "[LOGGER ERROR] Target '{}' failed: {} ({} failed writes so far)",
                target.name(),
                error,
                previous + 1
            );
        }
    }

    fn flush_pending(&self) -> usize {
        let _ordered = self.flush_lock.lock();
        let events = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return 0;
            }
            let capacity = pending.len();
            std::mem::replace(&mut *pending, Vec::with_capacity(capacity))
        };

        let snapshot = self.snapshot();
        for target in &snapshot.async_targets {
            let last = events
                .iter()
                .rposition(|event| event.level >= target.minimum_level());
            for (index, event) in events.iter().enumerate() {
                self.deliver(target.as_ref(), event, Some(index) == last);
            }
        }

        self.metrics.record_async_batch();
        events.len()
    }

    fn ensure_flush_loop(&self) {
        if self
            .flush_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let weak = self.weak_self.clone();
        let spawned = thread::Builder::new()
            .name("micrologger-flush".to_string())
            .spawn(move || loop {
                let interval = match weak.upgrade() {
                    Some(inner) => inner.snapshot().flush_interval,
                    None => break,
                };
                thread::sleep(interval);
                match weak.upgrade() {
                    Some(inner) => {
                        inner.flush_pending();
                    }
                    None => break,
                }
            });

        if let Err(e) = spawned {
            self.flush_started.store(false, Ordering::Release);
            eprintln!("[LOGGER ERROR] Failed to start async flush thread: {}", e);
        }
    }

    fn add_fixed_target(&self, target: Arc<dyn Target>, is_async: bool) {
        let mut fixed = self.fixed.lock();
        if is_async {
            fixed.async_targets.push(Arc::clone(&target));
        } else {
            fixed.sync_targets.push(Arc::clone(&target));
        }

        let mut next = Snapshot::clone(&self.snapshot());
        next.enabled = next.enabled.lowered_to(target.minimum_level());
        if is_async {
            next.async_targets.push(target);
        } else {
            next.sync_targets.push(target);
        }
        self.install(next);
        drop(fixed);

        if is_async {
            self.ensure_flush_loop();
        }
    }

    /// Read the attached file and apply it. `debounced` reloads inside the debounce window
    /// of the previous one are skipped.
    fn reload(&self, debounced: bool) -> Result<()> {
        let Some(path) = self.config.lock().as_ref().map(|source| source.path.clone()) else {
            return Ok(());
        };

        {
            let mut last_parse = self.last_parse.lock();
            if debounced && last_parse.is_some_and(|last| last.elapsed() < self.debounce) {
                return Ok(());
            }
            *last_parse = Some(Instant::now());
        }

        // A half-written or missing file must not swallow the notification for the finished one.
        let xml = match fs::read_to_string(&path) {
            Ok(xml) => xml,
            Err(e) => {
                *self.last_parse.lock() = None;
                eprintln!(
                    "[LOGGER WARNING] Cannot read config file '{}', keeping current targets: {}",
                    path.display(),
                    e
                );
                return Err(LoggerError::io_operation(
                    "reading config file",
                    path.display().to_string(),
                    e,
                ));
            }
        };
        if xml.trim().is_empty() {
            *self.last_parse.lock() = None;
            return Ok(());
        }

        self.apply_config(&xml)
    }

    fn apply_config(&self, xml: &str) -> Result<()> {
        let result = config::parse_document(xml).and_then(|blocks| self.reconcile(&blocks));
        if let Err(e) = &result {
            self.metrics.record_reparse_failure();
            eprintln!("[LOGGER ERROR] Error parsing config file: {}", e);
        }
        result
    }

    fn reconcile(&self, blocks: &[config::ConfigBlock]) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let factories = self.factories.read().clone();
        let flush_interval = self.snapshot().flush_interval;

        // No lock is held here: a factory may add fixed targets or register factories.
        let built = catch_unwind(AssertUnwindSafe(|| {
            build_configured(blocks, &factories, flush_interval)
        }));
        let configured = built.map_err(|panic_info| {
            LoggerError::target_panicked("factory", panic_message(&panic_info))
        })?;

        let mut fixed = self.fixed.lock();
        if generation < fixed.installed_generation {
            return Ok(());
        }
        fixed.installed_generation = generation;

        let mut next = Snapshot {
            sync_targets: fixed.sync_targets.clone(),
            async_targets: fixed.async_targets.clone(),
            enabled: configured.enabled,
            flush_interval: configured.flush_interval,
        };
        for target in fixed.sync_targets.iter().chain(fixed.async_targets.iter()) {
            next.enabled = next.enabled.lowered_to(target.minimum_level());
        }
        next.sync_targets.extend(configured.sync_targets);
        next.async_targets.extend(configured.async_targets);

        let has_async = !next.async_targets.is_empty();
        self.install(next);
        drop(fixed);

        self.metrics.record_reparse();
        if has_async {
            self.ensure_flush_loop();
        }
        Ok(())
    }

    /// Swap in a new snapshot. Callers hold the `fixed` lock.
    fn install(&self, next: Snapshot) {
        let floor = next.enabled.floor();
        *self.snapshot.write() = Arc::new(next);
        if self.is_global {
            level_cache::store(floor);
        }
    }
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        self.flush_pending();
    }
}

/// Targets and floor described by the configuration blocks alone, fixed targets excluded.
fn build_configured(
    blocks: &[config::ConfigBlock],
    factories: &HashMap<String, TargetFactory>,
    flush_interval: Duration,
) -> Snapshot {
    let mut configured = Snapshot {
        sync_targets: Vec::new(),
        async_targets: Vec::new(),
        enabled: EnabledLevels::from_floor(LogLevel::Fatal),
        flush_interval,
    };

    for block in blocks {
        configured.flush_interval = block.async_flush_time();
        let is_async = block.is_async();

        for node in &block.targets {
            let level = LogLevel::from_config_attr(node.attr("minlevel"));
            configured.enabled = configured.enabled.lowered_to(level);

            let Some(factory) = factories.get(node.attr_or("type", "")) else {
                continue;
            };
            let Some(target) = factory(level, Layout::compile(node.attr_or("layout", "")), node)
            else {
                continue;
            };
            if is_async {
                configured.async_targets.push(target);
            } else {
                configured.sync_targets.push(target);
            }
        }
    }
    configured
}

fn builtin_factories() -> HashMap<String, TargetFactory> {
    let mut factories: HashMap<String, TargetFactory> = HashMap::new();
    factories.insert(
        "console".to_string(),
        Arc::new(|level: LogLevel, layout: Layout, node: &ConfigNode| -> Option<Arc<dyn Target>> {
            Some(Arc::new(ConsoleTarget::from_config(level, layout, node)))
        }),
    );
    factories.insert(
        "file".to_string(),
        Arc::new(|level: LogLevel, layout: Layout, node: &ConfigNode| -> Option<Arc<dyn Target>> {
            FileTarget::from_config(level, layout, node)
                .map(|target| Arc::new(target) as Arc<dyn Target>)
        }),
    );
    factories.insert(
        "exceptions".to_string(),
        Arc::new(|level: LogLevel, layout: Layout, node: &ConfigNode| -> Option<Arc<dyn Target>> {
            FileTarget::exceptions_from_config(level, layout, node)
                .map(|target| Arc::new(target) as Arc<dyn Target>)
        }),
    );
    factories
}

/// `MICROLOG_CONFIG` if set, otherwise the executable path with `.config` appended.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let exe = std::env::current_exe()
        .map_err(|e| LoggerError::io_operation("locating executable", "current_exe", e))?;
    let mut path = exe.into_os_string();
    path.push(".config");
    Ok(PathBuf::from(path))
}

fn panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        minimum_level: LogLevel,
        layout: Layout,
        lines: Mutex<Vec<(String, bool)>>,
    }

    impl Recorder {
        fn at(minimum_level: LogLevel) -> Arc<Self> {
            Arc::new(Self {
                minimum_level,
                layout: Layout::compile("$message"),
                lines: Mutex::new(Vec::new()),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.lines.lock().iter().map(|(m, _)| m.clone()).collect()
        }

        fn flushes(&self) -> Vec<bool> {
            self.lines.lock().iter().map(|(_, f)| *f).collect()
        }
    }

    impl Target for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn minimum_level(&self) -> LogLevel {
            self.minimum_level
        }

        fn layout(&self) -> &Layout {
            &self.layout
        }

        fn write(&self, event: &LogEvent, flush_after_write: bool) -> Result<()> {
            self.lines
                .lock()
                .push((self.layout.render(Some(event)), flush_after_write));
            Ok(())
        }
    }

    struct Broken;

    impl Target for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn minimum_level(&self) -> LogLevel {
            LogLevel::Trace
        }

        fn layout(&self) -> &Layout {
            unreachable!("layout is never consulted")
        }

        fn write(&self, event: &LogEvent, _flush_after_write: bool) -> Result<()> {
            if event.message == "panic" {
                panic!("sink exploded");
            }
            Err(LoggerError::other("sink unavailable"))
        }
    }

    fn event(level: LogLevel, message: &str) -> LogEvent {
        LogEvent::new("tests", level, message)
    }

    #[test]
    fn test_unconfigured_dispatcher_drops_events() {
        let dispatcher = OutputDispatcher::new();
        dispatcher.write(event(LogLevel::Fatal, "nobody listens"));
        assert_eq!(dispatcher.pending_len(), 0);
        assert_eq!(dispatcher.enabled_levels(), EnabledLevels::NONE);
        assert!(!dispatcher.is_fatal_enabled());
    }

    #[test]
    fn test_fixed_sync_target_receives_admitted_events() {
        let dispatcher = OutputDispatcher::new();
        let recorder = Recorder::at(LogLevel::Info);
        dispatcher.add_fixed_target(recorder.clone(), false);

        dispatcher.write(event(LogLevel::Debug, "debug"));
        dispatcher.write(event(LogLevel::Info, "info"));
        dispatcher.write(event(LogLevel::Error, "error"));

        assert_eq!(recorder.messages(), vec!["info", "error"]);
        assert_eq!(recorder.flushes(), vec![true, true]);
        assert!(dispatcher.is_info_enabled());
        assert!(!dispatcher.is_debug_enabled());
    }

    #[test]
    fn test_async_batch_flushes_only_last_admitted_write() {
        let dispatcher = OutputDispatcher::new();
        let all = Recorder::at(LogLevel::Trace);
        let warn = Recorder::at(LogLevel::Warn);
        dispatcher.add_fixed_target(all.clone(), true);
        dispatcher.add_fixed_target(warn.clone(), true);

        dispatcher.write(event(LogLevel::Info, "one"));
        dispatcher.write(event(LogLevel::Warn, "two"));
        dispatcher.write(event(LogLevel::Error, "three"));
        dispatcher.write(event(LogLevel::Debug, "four"));

        // The background loop may already have drained part of the queue.
        dispatcher.flush_pending();
        std::thread::sleep(Duration::from_millis(200));
        dispatcher.flush_pending();

        assert_eq!(all.messages(), vec!["one", "two", "three", "four"]);
        assert_eq!(warn.messages(), vec!["two", "three"]);
        assert!(all.flushes().last().copied().unwrap_or(false));
        assert!(warn.flushes().last().copied().unwrap_or(false));
    }

    #[test]
    fn test_single_batch_flush_flags() {
        let dispatcher = OutputDispatcher::new();
        let recorder = Recorder::at(LogLevel::Trace);
        let warn = Recorder::at(LogLevel::Warn);
        {
            let mut next = Snapshot::empty();
            next.async_targets.push(recorder.clone());
            next.async_targets.push(warn.clone());
            // Installed directly so no flush loop races the manual drain below.
            dispatcher.inner.install(next);
        }

        for (level, message) in [
            (LogLevel::Info, "a"),
            (LogLevel::Warn, "b"),
            (LogLevel::Debug, "c"),
        ] {
            dispatcher.write(event(level, message));
        }
        assert_eq!(dispatcher.pending_len(), 3);
        assert_eq!(dispatcher.flush_pending(), 3);
        assert_eq!(dispatcher.pending_len(), 0);

        assert_eq!(recorder.messages(), vec!["a", "b", "c"]);
        assert_eq!(recorder.flushes(), vec![false, false, true]);
        assert_eq!(warn.messages(), vec!["b"]);
        assert_eq!(warn.flushes(), vec![true]);
        assert_eq!(dispatcher.metrics().async_batches(), 1);
    }

    #[test]
    fn test_failing_target_is_isolated() {
        let dispatcher = OutputDispatcher::new();
        let recorder = Recorder::at(LogLevel::Trace);
        dispatcher.add_fixed_target(Arc::new(Broken), false);
        dispatcher.add_fixed_target(recorder.clone(), false);

        dispatcher.write(event(LogLevel::Info, "error"));
        dispatcher.write(event(LogLevel::Info, "panic"));

        assert_eq!(recorder.messages(), vec!["error", "panic"]);
        assert_eq!(dispatcher.metrics().dropped_count(), 2);
        assert_eq!(dispatcher.metrics().total_written(), 2);
    }

    #[test]
    fn test_apply_config_reconciles_with_fixed_targets() {
        let dispatcher = OutputDispatcher::new();
        let fixed = Recorder::at(LogLevel::Error);
        dispatcher.add_fixed_target(fixed.clone(), false);

        let configured = Recorder::at(LogLevel::Trace);
        let shared = configured.clone();
        dispatcher.add_config_factory("recorder", move |_, _, _| -> Arc<dyn Target> {
            shared.clone()
        });

        dispatcher
            .apply_config(
                r#"<configuration>
                     <microlog><target type="recorder" minlevel="debug"/></microlog>
                     <microlog async="true" asyncflushtime="300"><target type="missing" minlevel="trace"/></microlog>
                   </configuration>"#,
            )
            .unwrap();

        assert_eq!(dispatcher.target_names(), vec!["recorder", "recorder"]);
        assert_eq!(dispatcher.sync_target_count(), 2);
        assert_eq!(dispatcher.async_target_count(), 0);
        assert_eq!(dispatcher.flush_interval(), Duration::from_millis(300));
        // The unknown type still counts towards the enabled floor.
        assert!(dispatcher.is_trace_enabled());

        dispatcher.write(event(LogLevel::Warn, "warn"));
        assert_eq!(fixed.messages(), Vec::<String>::new());
        assert_eq!(configured.messages(), vec!["warn"]);

        // A second reload replaces configured targets but keeps the fixed one.
        dispatcher
            .apply_config(r#"<microlog><target type="recorder" minlevel="error"/></microlog>"#)
            .unwrap();
        assert_eq!(dispatcher.sync_target_count(), 2);
        assert!(!dispatcher.is_warn_enabled());
        assert!(dispatcher.is_error_enabled());
        assert_eq!(dispatcher.metrics().reparse_count(), 2);
    }

    #[test]
    fn test_malformed_config_keeps_previous_snapshot() {
        let dispatcher = OutputDispatcher::new();
        dispatcher
            .apply_config(r#"<microlog><target type="console" minlevel="info"/></microlog>"#)
            .unwrap();
        assert_eq!(dispatcher.sync_target_count(), 1);

        let result = dispatcher.apply_config("<microlog><target type=\"console\"></microlog");
        assert!(result.is_err());
        assert_eq!(dispatcher.sync_target_count(), 1);
        assert!(dispatcher.is_info_enabled());
        assert_eq!(dispatcher.metrics().reparse_failures(), 1);
    }

    #[test]
    fn test_panicking_factory_keeps_previous_snapshot() {
        let dispatcher = OutputDispatcher::new();
        dispatcher.add_config_factory("bad", |_, _, _| -> Arc<dyn Target> {
            panic!("factory failed")
        });
        let result = dispatcher.apply_config(r#"<microlog><target type="bad"/></microlog>"#);
        assert!(matches!(result, Err(LoggerError::TargetPanicked { .. })));
        assert_eq!(dispatcher.enabled_levels(), EnabledLevels::NONE);
    }

    #[test]
    fn test_factory_may_reenter_dispatcher() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("app.config");
        fs::write(
            &path,
            r#"<microlog><target type="reentrant" minlevel="info"/><target type="late" minlevel="info"/></microlog>"#,
        )
        .unwrap();

        let dispatcher = OutputDispatcher::new();
        let fixed = Recorder::at(LogLevel::Trace);
        let late = Recorder::at(LogLevel::Trace);
        let handle = dispatcher.clone();
        let (fixed_for_factory, late_for_factory) = (fixed.clone(), late.clone());
        let entered = AtomicBool::new(false);
        dispatcher.add_config_factory("reentrant", move |_, _, _| -> Arc<dyn Target> {
            if !entered.swap(true, Ordering::SeqCst) {
                handle.add_fixed_target(fixed_for_factory.clone(), false);
                let late = late_for_factory.clone();
                handle.add_config_factory("late", move |_, _, _| -> Arc<dyn Target> {
                    late.clone()
                });
            }
            Recorder::at(LogLevel::Info)
        });

        dispatcher.attach_config_file(&path).unwrap();

        assert_eq!(dispatcher.sync_target_count(), 3);
        assert!(dispatcher.is_trace_enabled());
        dispatcher.write(event(LogLevel::Info, "after"));
        assert_eq!(fixed.messages(), vec!["after"]);
        assert_eq!(late.messages(), vec!["after"]);
    }

    #[test]
    fn test_empty_read_does_not_debounce_the_next_change() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("app.config");
        fs::write(&path, r#"<microlog><target type="console" minlevel="error"/></microlog>"#)
            .unwrap();

        let dispatcher = OutputDispatcher::with_debounce(Duration::from_secs(60));
        dispatcher.attach_config_file(&path).unwrap();
        assert!(!dispatcher.is_warn_enabled());

        fs::write(&path, "").unwrap();
        dispatcher.inner.reload(true).unwrap();
        assert!(dispatcher.is_error_enabled());

        fs::write(&path, r#"<microlog><target type="console" minlevel="debug"/></microlog>"#)
            .unwrap();
        dispatcher.inner.reload(true).unwrap();
        assert!(dispatcher.is_debug_enabled());
    }

    #[test]
    fn test_config_without_targets_enables_fatal_only() {
        let dispatcher = OutputDispatcher::new();
        dispatcher.apply_config("<configuration/>").unwrap();
        assert!(dispatcher.is_fatal_enabled());
        assert!(!dispatcher.is_error_enabled());
    }

    #[test]
    fn test_attach_missing_file_fails() {
        let dispatcher = OutputDispatcher::new();
        let result = dispatcher.attach_config_file("/definitely/not/here/app.config");
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
        assert_eq!(dispatcher.config_path(), None);
    }

    #[test]
    fn test_enabled_levels() {
        let levels = EnabledLevels::from_floor(LogLevel::Warn);
        assert!(!levels.is_enabled(LogLevel::Info));
        assert!(levels.is_enabled(LogLevel::Warn));
        assert!(levels.is_enabled(LogLevel::Fatal));
        assert_eq!(
            levels.lowered_to(LogLevel::Debug).floor(),
            Some(LogLevel::Debug)
        );
        assert_eq!(
            EnabledLevels::NONE.lowered_to(LogLevel::Error).floor(),
            Some(LogLevel::Error)
        );
    }
}
