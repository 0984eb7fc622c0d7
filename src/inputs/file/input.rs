// SPDX-License-Identifier: Apache-2.0

//! Wires one configured file input together: path resolution, filesystem
//! observation, scheduled chunk readers and the chunk processor.

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, info, warn};

use crate::bounded_channel::{bounded, BoundedSender};
use crate::inputs::file::config::{FileInputConfig, ReadFrom};
use crate::inputs::file::error::Result;
use crate::inputs::file::path_set::PathSet;
use crate::inputs::file::processor::ChunkProcessor;
use crate::inputs::file::scheduler::ChunkReaderScheduler;
use crate::inputs::file::splitter::ContentSplitter;
use crate::inputs::file::watcher::{DirectoryWatcher, PathEventListener};
use crate::message::{Message, MessageBuilder};

/// Chunks in flight between the readers of one input and its processor.
const CHUNK_QUEUE_SIZE: usize = 16;

pub struct FileInput {
    config: FileInputConfig,
    messages_tx: BoundedSender<Message>,
}

impl FileInput {
    pub fn new(config: FileInputConfig, messages_tx: BoundedSender<Message>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            messages_tx,
        })
    }

    /// Begin tailing. Spawns the chunk processor onto `tasks` and registers
    /// with `watcher` for files appearing later. Files already present are
    /// read from the configured position; files discovered through events
    /// are always read from the start.
    pub fn start(
        self,
        tasks: &mut JoinSet<core::result::Result<(), BoxError>>,
        cancel: CancellationToken,
        watcher: &DirectoryWatcher,
    ) -> Result<()> {
        let splitter = ContentSplitter::build(
            self.config.splitter,
            self.config.encoding()?,
            self.config.split_pattern.as_deref(),
        )?;
        let path_set = PathSet::new(&self.config.path_pattern)?;

        let (chunks_tx, chunks_rx) = bounded(CHUNK_QUEUE_SIZE);
        let scheduler = Arc::new(ChunkReaderScheduler::new(
            chunks_tx,
            self.config.chunk_size,
            self.config.read_interval,
            self.config.follow,
            cancel.clone(),
        ));

        let initial = path_set.paths();
        if initial.is_empty() {
            info!(
                input = self.config.id,
                pattern = self.config.path_pattern,
                "no files match yet, waiting for them to appear"
            );
        }
        for path in &initial {
            scheduler.follow(path, self.config.read_from);
        }

        let listener = Arc::new(FollowSetListener {
            path_set: path_set.clone(),
            scheduler: scheduler.clone(),
        });
        watcher.observe(path_set.root_path(), listener)?;

        let mut template = MessageBuilder::new();
        template.input_id(&self.config.id)?;
        template.source(&self.config.source)?;
        template.outputs(self.config.outputs.clone())?;

        let processor = ChunkProcessor::new(chunks_rx, self.messages_tx, splitter, template);
        let id = self.config.id;
        tasks.spawn(async move {
            processor.run(cancel).await;
            debug!(input = id, "file input finished");
            Ok(())
        });

        Ok(())
    }
}

/// Keeps the scheduler's followed set in sync with filesystem events for one
/// input's path pattern.
struct FollowSetListener {
    path_set: PathSet,
    scheduler: Arc<ChunkReaderScheduler>,
}

impl PathEventListener for FollowSetListener {
    fn path_created(&self, path: &Path) {
        if self.path_set.contains(path) && !self.scheduler.is_following(path) {
            self.scheduler.follow(path, ReadFrom::Start);
        }
    }

    fn path_modified(&self, path: &Path) {
        // A matching file can surface through modify alone, e.g. when it
        // existed before observation began but was empty then
        if self.path_set.contains(path) && !self.scheduler.is_following(path) {
            self.scheduler.follow(path, ReadFrom::Start);
        }
    }

    fn path_removed(&self, path: &Path) {
        if self.path_set.contains(path) {
            self.scheduler.cancel(path);
        }
    }

    fn cannot_observe(&self, path: &Path) {
        warn!(
            pattern = self.path_set.pattern(),
            path = %path.display(),
            "watched directory removed, new files there will not be noticed"
        );
    }
}
