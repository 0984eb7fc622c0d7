// SPDX-License-Identifier: Apache-2.0

//! The per-invocation unit of work for one tailed file: a single bounded
//! read, with truncation detection and a capacity-1 staging slot that keeps
//! an already-read chunk alive while the shared queue is full.

use bytes::Bytes;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use crate::bounded_channel::{BoundedSender, TrySendError};
use crate::inputs::file::chunk::RawChunk;
use crate::inputs::file::config::ReadFrom;
use crate::inputs::file::error::Result;
use crate::inputs::file::file_id::FileId;

/// Outcome of one scheduled tick. Primarily for tests and tracing; the
/// scheduler only cares about the terminal variants.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous invocation is still mid-read; skipped without blocking.
    Busy,
    /// The staged chunk from a previous tick was enqueued; no new read.
    Retried,
    /// The shared queue is full; a chunk is parked in the staging slot.
    Backpressure,
    /// File size equals the read position; nothing to do.
    NoChange,
    /// Read and enqueued this many bytes.
    Read(usize),
    /// Final chunk enqueued; no more reads will occur for this path.
    Eof,
    /// The chunk queue's receiver is gone; stop ticking.
    Disconnected,
    /// An I/O failure was logged; state is unchanged and the next scheduled
    /// tick retries. No backoff, no permanent failure state.
    Failed,
}

pub struct ChunkReader {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    file_id: FileId,
    position: u64,
    chunk_size: usize,
    follow: bool,
    sequence: u64,
    staged: Option<RawChunk>,
    in_flight: AtomicBool,
}

impl ChunkReader {
    /// Open `path` for tailing. `ReadFrom::End` starts at the current file
    /// size; `ReadFrom::Start` at offset 0.
    pub fn open(path: &Path, read_from: ReadFrom, chunk_size: usize, follow: bool) -> Result<Self> {
        let std_file = std::fs::File::open(path)?;
        let file_id = FileId::from_file(&std_file)?;
        let position = match read_from {
            ReadFrom::Start => 0,
            ReadFrom::End => std_file.metadata()?.len(),
        };

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(tokio::fs::File::from_std(std_file)),
            file_id,
            position,
            chunk_size,
            follow,
            sequence: 0,
            staged: None,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity captured at open time. Recorded for rotation diagnostics;
    /// rotation itself is handled by the watcher cancelling and re-following.
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Perform one scheduled tick. At most one invocation per reader makes
    /// progress at a time: a tick that finds the in-flight flag set returns
    /// immediately rather than waiting.
    pub async fn tick(&mut self, chunks: &BoundedSender<RawChunk>) -> TickOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return TickOutcome::Busy;
        }
        let outcome = self.locked_tick(chunks).await;
        self.in_flight.store(false, Ordering::Release);
        outcome
    }

    async fn locked_tick(&mut self, chunks: &BoundedSender<RawChunk>) -> TickOutcome {
        // A successfully-read chunk is never discarded: drain the staging
        // slot before anything else, and do not read while it is occupied.
        if let Some(chunk) = self.staged.take() {
            let was_final = chunk.is_final();
            match chunks.try_send(chunk) {
                Ok(()) => {
                    if was_final {
                        return TickOutcome::Eof;
                    }
                    return TickOutcome::Retried;
                }
                Err(TrySendError::Full(chunk)) => {
                    self.staged = Some(chunk);
                    return TickOutcome::Backpressure;
                }
                Err(TrySendError::Disconnected(_)) => return TickOutcome::Disconnected,
            }
        }

        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return TickOutcome::Eof,
        };

        let size = match file.metadata().await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to stat file, retrying on next tick");
                return TickOutcome::Failed;
            }
        };

        if size < self.position {
            debug!(
                path = %self.path.display(),
                size,
                position = self.position,
                "file truncated, restarting from offset 0"
            );
            self.position = 0;
        }

        if size == self.position {
            if self.follow {
                return TickOutcome::NoChange;
            }
            // End of file with following disabled: close the file and hand
            // the processor its final-chunk sentinel.
            self.file = None;
            self.sequence += 1;
            let sentinel = RawChunk {
                path: self.path.clone(),
                payload: None,
                sequence: self.sequence,
                offset: self.position,
            };
            return match chunks.try_send(sentinel) {
                Ok(()) => TickOutcome::Eof,
                Err(TrySendError::Full(sentinel)) => {
                    self.staged = Some(sentinel);
                    TickOutcome::Backpressure
                }
                Err(TrySendError::Disconnected(_)) => TickOutcome::Disconnected,
            };
        }

        let read_len = (size - self.position).min(self.chunk_size as u64) as usize;

        if let Err(e) = file.seek(SeekFrom::Start(self.position)).await {
            warn!(path = %self.path.display(), error = %e, "seek failed, retrying on next tick");
            return TickOutcome::Failed;
        }

        let mut buf = vec![0u8; read_len];
        let n = match file.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "read failed, retrying on next tick");
                return TickOutcome::Failed;
            }
        };
        if n == 0 {
            // Lost a race with truncation; the next tick re-checks the size
            return TickOutcome::NoChange;
        }
        buf.truncate(n);

        self.sequence += 1;
        let chunk = RawChunk {
            path: self.path.clone(),
            payload: Some(Bytes::from(buf)),
            sequence: self.sequence,
            offset: self.position,
        };
        self.position += n as u64;

        match chunks.try_send(chunk) {
            Ok(()) => TickOutcome::Read(n),
            Err(TrySendError::Full(chunk)) => {
                self.staged = Some(chunk);
                TickOutcome::Backpressure
            }
            Err(TrySendError::Disconnected(_)) => TickOutcome::Disconnected,
        }
    }
}
