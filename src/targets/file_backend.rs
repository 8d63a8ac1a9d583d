//! Shared file handle table for file targets
//!
//! Every file target appends through one [`FileSinkBackend`], which keeps at most one open
//! handle per resolved path. Handles are opened lazily, counted on every write, and closed by a
//! periodic sweep once a whole sweep interval passes without a write. The sweep also flushes
//! every open handle, so buffered lines reach disk even when no writer asks for a flush.

use crate::core::{LoggerError, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once, OnceLock, Weak};
use std::thread;
use std::time::Duration;

/// Default interval between handle sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(20);

const WRITE_BUFFER_SIZE: usize = 10 * 1024;

struct OpenSink {
    /// `None` once evicted; a writer holding a stale handle must look the path up again.
    writer: Mutex<Option<BufWriter<File>>>,
    accesses: AtomicU64,
}

pub struct FileSinkBackend {
    base_dir: PathBuf,
    sinks: RwLock<HashMap<PathBuf, Arc<OpenSink>>>,
    sweep_interval: Duration,
    sweeper: Once,
    weak_self: Weak<FileSinkBackend>,
}

impl FileSinkBackend {
    /// The process-wide backend, resolving paths against the executable's directory.
    pub fn global() -> &'static Arc<FileSinkBackend> {
        static GLOBAL: OnceLock<Arc<FileSinkBackend>> = OnceLock::new();
        GLOBAL.get_or_init(|| FileSinkBackend::new(executable_dir()))
    }

    pub fn new(base_dir: impl Into<PathBuf>) -> Arc<Self> {
        Self::with_sweep_interval(base_dir, SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(base_dir: impl Into<PathBuf>, sweep_interval: Duration) -> Arc<Self> {
        let base_dir = base_dir.into();
        Arc::new_cyclic(|weak_self| Self {
            base_dir,
            sinks: RwLock::new(HashMap::new()),
            sweep_interval,
            sweeper: Once::new(),
            weak_self: weak_self.clone(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `path` against the base directory. Absolute paths are used as-is.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Append `text` and a newline to the file at `path`, creating directories and the file
    /// as needed.
    ///
    /// On failure the line is dropped for this file; nothing is retried or buffered.
    pub fn write(&self, path: &str, text: &str, flush_after_write: bool) -> Result<()> {
        self.ensure_sweeper();
        let resolved = self.resolve(path);

        // A sweep may close the handle between lookup and lock; reopening covers that.
        for _ in 0..3 {
            let sink = self.get_or_open(&resolved)?;
            let mut guard = sink.writer.lock();
            let Some(writer) = guard.as_mut() else {
                continue;
            };

            writer
                .write_all(text.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| {
                    LoggerError::io_operation("writing log file", resolved.display().to_string(), e)
                })?;
            if flush_after_write {
                writer.flush().map_err(|e| {
                    LoggerError::io_operation("flushing log file", resolved.display().to_string(), e)
                })?;
            }
            return Ok(());
        }

        Err(LoggerError::file_sink(
            resolved.display().to_string(),
            "handle closed while writing",
        ))
    }

    /// Flush every open handle and close those with no writes since the previous sweep.
    pub fn sweep(&self) {
        let mut sinks = self.sinks.write();
        sinks.retain(|path, sink| {
            let mut guard = sink.writer.lock();
            let idle = sink.accesses.swap(0, Ordering::Relaxed) == 0;
            if let Some(writer) = guard.as_mut() {
                if let Err(e) = writer.flush() {
                    eprintln!(
                        "[LOGGER ERROR] Failed to flush '{}': {}",
                        path.display(),
                        e
                    );
                }
            }
            if idle {
                *guard = None;
            }
            !idle
        });
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.sinks.read().len()
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.sinks.read().contains_key(&self.resolve(path))
    }

    /// Look up or open the handle for `resolved`, counting the access so the next sweep
    /// leaves it open.
    fn get_or_open(&self, resolved: &Path) -> Result<Arc<OpenSink>> {
        if let Some(sink) = self.sinks.read().get(resolved) {
            sink.accesses.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(sink));
        }

        let mut sinks = self.sinks.write();
        if let Some(sink) = sinks.get(resolved) {
            sink.accesses.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(sink));
        }

        let file = open_append(resolved)?;
        let sink = Arc::new(OpenSink {
            writer: Mutex::new(Some(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file))),
            accesses: AtomicU64::new(1),
        });
        sinks.insert(resolved.to_path_buf(), Arc::clone(&sink));
        Ok(sink)
    }

    fn ensure_sweeper(&self) {
        self.sweeper.call_once(|| {
            let weak = self.weak_self.clone();
            let interval = self.sweep_interval;
            let spawned = thread::Builder::new()
                .name("micrologger-file-sweep".to_string())
                .spawn(move || loop {
                    thread::sleep(interval);
                    match weak.upgrade() {
                        Some(backend) => backend.sweep(),
                        None => break,
                    }
                });
            if let Err(e) = spawned {
                eprintln!("[LOGGER ERROR] Failed to start file sweep thread: {}", e);
            }
        });
    }
}

impl Drop for FileSinkBackend {
    fn drop(&mut self) {
        for sink in self.sinks.get_mut().values() {
            if let Some(writer) = sink.writer.lock().as_mut() {
                let _ = writer.flush();
            }
        }
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation("creating log directory", parent.display().to_string(), e)
            })?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggerError::io_operation("opening log file", path.display().to_string(), e))
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
