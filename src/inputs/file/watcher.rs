// SPDX-License-Identifier: Apache-2.0

//! Shared file system watcher built on the `notify` crate.
//!
//! Uses OS-level notifications (inotify on Linux, FSEvents on macOS,
//! ReadDirectoryChangesW on Windows). Directories are watched
//! non-recursively; observing a root registers every directory beneath it,
//! and directories created later are registered as their create events
//! arrive. A single dispatch thread fans events out to the listeners
//! registered for the affected directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::inputs::file::error::{Error, Result};

/// Callbacks for path-level file system activity. Implementations are shared
/// across threads and invoked from the watcher's dispatch thread.
pub trait PathEventListener: Send + Sync {
    fn path_created(&self, path: &Path);
    fn path_modified(&self, path: &Path);
    fn path_removed(&self, path: &Path);
    /// The watched directory itself disappeared; no further events will be
    /// delivered for anything beneath it.
    fn cannot_observe(&self, path: &Path);
}

struct WatcherShared {
    watcher: Mutex<RecommendedWatcher>,
    /// Listeners keyed by the watched directory.
    registrations: Mutex<HashMap<PathBuf, Vec<Arc<dyn PathEventListener>>>>,
}

pub struct DirectoryWatcher {
    shared: Arc<WatcherShared>,
    cancel: CancellationToken,
    dispatch: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Start the watcher and its dispatch thread. `poll_timeout` bounds how
    /// long the thread blocks before re-checking for shutdown.
    pub fn spawn(poll_timeout: Duration) -> Result<Self> {
        let (tx, rx) = channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        let shared = Arc::new(WatcherShared {
            watcher: Mutex::new(watcher),
            registrations: Mutex::new(HashMap::new()),
        });
        let cancel = CancellationToken::new();

        let dispatch = {
            let shared = shared.clone();
            let cancel = cancel.clone();
            std::thread::Builder::new()
                .name("fs-watcher".to_string())
                .spawn(move || loop {
                    match rx.recv_timeout(poll_timeout) {
                        Ok(Ok(event)) => dispatch_event(&shared, event),
                        Ok(Err(e)) => {
                            // Kernel-side overflow or backend failure; events
                            // may be lost but watching continues
                            warn!(error = %e, "file watcher error");
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if cancel.is_cancelled() {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                })
                .map_err(|e| Error::Watcher(e.to_string()))?
        };

        Ok(Self {
            shared,
            cancel,
            dispatch: Some(dispatch),
        })
    }

    /// Register `listener` for events beneath `root`, watching `root` and
    /// every directory under it. `root` must exist and be a directory.
    pub fn observe(&self, root: &Path, listener: Arc<dyn PathEventListener>) -> Result<()> {
        if !root.is_dir() {
            return Err(Error::Watcher(format!(
                "not a watchable directory: {}",
                root.display()
            )));
        }

        for entry in WalkDir::new(root).into_iter().filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        }) {
            if entry.file_type().is_dir() {
                register(&self.shared, entry.path(), &listener)?;
            }
        }
        Ok(())
    }

    /// Stop the dispatch thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.dispatch.take() {
            if handle.join().is_err() {
                warn!("file watcher dispatch thread panicked");
            }
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn register(
    shared: &Arc<WatcherShared>,
    dir: &Path,
    listener: &Arc<dyn PathEventListener>,
) -> Result<()> {
    let mut registrations = shared
        .registrations
        .lock()
        .unwrap_or_else(|e| e.into_inner());

    match registrations.get_mut(dir) {
        Some(listeners) => {
            if !listeners.iter().any(|l| Arc::ptr_eq(l, listener)) {
                listeners.push(listener.clone());
            }
        }
        None => {
            let mut watcher = shared.watcher.lock().unwrap_or_else(|e| e.into_inner());
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            registrations.insert(dir.to_path_buf(), vec![listener.clone()]);
            debug!(path = %dir.display(), "watching directory");
        }
    }
    Ok(())
}

fn dispatch_event(shared: &Arc<WatcherShared>, event: Event) {
    enum Change {
        Created,
        Modified,
        Removed,
    }

    let change = match event.kind {
        EventKind::Create(_) => Change::Created,
        EventKind::Modify(_) => Change::Modified,
        EventKind::Remove(_) => Change::Removed,
        _ => return,
    };

    for path in &event.paths {
        // A removed path that was itself a watched directory invalidates its
        // whole registration; its listeners are told they are blind now.
        if matches!(change, Change::Removed) {
            let removed = {
                let mut registrations = shared
                    .registrations
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                registrations.remove(path.as_path())
            };
            if let Some(listeners) = removed {
                let mut watcher = shared.watcher.lock().unwrap_or_else(|e| e.into_inner());
                let _ = watcher.unwatch(path);
                drop(watcher);
                for listener in &listeners {
                    listener.cannot_observe(path);
                }
            }
        }

        let Some(parent) = path.parent() else { continue };
        let listeners = {
            let registrations = shared
                .registrations
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            registrations.get(parent).cloned()
        };
        let Some(listeners) = listeners else { continue };

        // A directory created under a watched one joins the watch set so
        // files appearing inside it are seen too
        if matches!(change, Change::Created) && path.is_dir() {
            for listener in &listeners {
                for entry in WalkDir::new(path).into_iter().flatten() {
                    if entry.file_type().is_dir() {
                        if let Err(e) = register(shared, entry.path(), listener) {
                            warn!(path = %entry.path().display(), error = %e, "unable to watch new directory");
                        }
                    }
                }
            }
        }

        for listener in &listeners {
            match change {
                Change::Created => listener.path_created(path),
                Change::Modified => listener.path_modified(path),
                Change::Removed => listener.path_removed(path),
            }
        }
    }
}
