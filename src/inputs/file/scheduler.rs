// SPDX-License-Identifier: Apache-2.0

//! Ownership of per-file read loops. Each followed path gets its own task
//! ticking a [`ChunkReader`] at a fixed interval; the scheduler is shared
//! with the filesystem watcher, which follows and cancels paths as they
//! appear and disappear.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bounded_channel::BoundedSender;
use crate::inputs::file::chunk::RawChunk;
use crate::inputs::file::chunk_reader::{ChunkReader, TickOutcome};
use crate::inputs::file::config::ReadFrom;

struct FollowedFile {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct ChunkReaderScheduler {
    chunks_tx: BoundedSender<RawChunk>,
    chunk_size: usize,
    read_interval: Duration,
    follow: bool,
    cancel: CancellationToken,
    tasks: Mutex<HashMap<PathBuf, FollowedFile>>,
    handle: tokio::runtime::Handle,
}

impl ChunkReaderScheduler {
    pub fn new(
        chunks_tx: BoundedSender<RawChunk>,
        chunk_size: usize,
        read_interval: Duration,
        follow: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            chunks_tx,
            chunk_size,
            read_interval,
            follow,
            cancel,
            tasks: Mutex::new(HashMap::new()),
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Start following `path` if it isn't already followed. Open failures are
    /// logged and dropped; the watcher will call again on the next event for
    /// the path.
    pub fn follow(&self, path: &Path, read_from: ReadFrom) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|_, followed| !followed.task.is_finished());
        if tasks.contains_key(path) {
            return;
        }

        let reader = match ChunkReader::open(path, read_from, self.chunk_size, self.follow) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unable to open file for tailing");
                return;
            }
        };
        debug!(path = %path.display(), file_id = %reader.file_id(), "following file");

        let cancel = self.cancel.child_token();
        let task = self.handle.spawn(run_reader(
            reader,
            self.chunks_tx.clone(),
            self.read_interval,
            cancel.clone(),
        ));
        tasks.insert(path.to_path_buf(), FollowedFile { cancel, task });
    }

    /// Stop following `path`. Best effort: a tick already in progress runs
    /// to completion, but anything still in the staging slot is dropped.
    pub fn cancel(&self, path: &Path) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(followed) = tasks.remove(path) {
            debug!(path = %path.display(), "stopped following file");
            followed.cancel.cancel();
        }
    }

    pub fn is_following(&self, path: &Path) -> bool {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks
            .get(path)
            .map(|followed| !followed.task.is_finished())
            .unwrap_or(false)
    }
}

async fn run_reader(
    mut reader: ChunkReader,
    chunks_tx: BoundedSender<RawChunk>,
    read_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(read_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match reader.tick(&chunks_tx).await {
                    TickOutcome::Eof => break,
                    TickOutcome::Disconnected => {
                        debug!(path = %reader.path().display(), "chunk queue closed, stopping reader");
                        break;
                    },
                    _ => {}
                }
            },
            _ = cancel.cancelled() => break,
        }
    }
}
