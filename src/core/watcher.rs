//! Configuration file watching
//!
//! Wraps the OS file-change notifications behind a small capability: subscribe to one file and
//! receive [`ConfigChange`]s on a dedicated thread. The parent directory is watched rather than
//! the file itself, because editors commonly save by writing a temporary file and renaming it
//! over the original.

use super::error::Result;
use crossbeam_channel::unbounded;
use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    Created,
    Modified,
    Renamed,
    Removed,
}

impl ConfigChange {
    fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ConfigChange::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ConfigChange::Renamed),
            EventKind::Modify(_) => Some(ConfigChange::Modified),
            // Arrives once a writer is done, after any truncate and write notifications.
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(ConfigChange::Modified),
            EventKind::Remove(_) => Some(ConfigChange::Removed),
            _ => None,
        }
    }
}

/// A live subscription. Dropping it stops the notifications and lets the delivery thread exit.
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Watch `path` and call `on_change` for every create, modify, rename or delete of it.
    pub fn spawn<F>(path: &Path, on_change: F) -> Result<Self>
    where
        F: Fn(ConfigChange) + Send + 'static,
    {
        let path = path.to_path_buf();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|name| name.to_os_string());

        let (tx, rx) = unbounded::<ConfigChange>();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        eprintln!("[LOGGER WARNING] Config watch error: {}", e);
                        return;
                    }
                };
                let Some(change) = ConfigChange::from_kind(&event.kind) else {
                    return;
                };
                let touches_file = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if touches_file {
                    let _ = tx.send(change);
                }
            },
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        thread::Builder::new()
            .name("micrologger-config-watch".to_string())
            .spawn(move || {
                // Ends once the watcher, and with it the sender, is dropped.
                for change in rx.iter() {
                    on_change(change);
                }
            })?;

        Ok(Self {
            path,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher").field("path", &self.path).finish()
    }
}
