// SPDX-License-Identifier: Apache-2.0

//! Log collection from files on the local filesystem.
//!
//! A [`FileInput`] resolves its configured [`PathSet`], follows each matching
//! file with a scheduled [`ChunkReader`], and keeps the followed set current
//! through a shared [`DirectoryWatcher`]. Raw chunks flow over a bounded
//! queue into a [`ChunkProcessor`], which accumulates them per file, splits
//! them into records and emits messages.

pub mod chunk;
pub mod chunk_buffer;
pub mod chunk_reader;
pub mod config;
pub mod error;
pub mod file_id;
pub mod input;
pub mod path_set;
pub mod processor;
pub mod scheduler;
pub mod splitter;
pub mod watcher;

pub use chunk::RawChunk;
pub use chunk_buffer::FileChunkBuffer;
pub use chunk_reader::ChunkReader;
pub use config::{FileInputConfig, ReadFrom};
pub use error::Error;
pub use input::FileInput;
pub use path_set::PathSet;
pub use processor::ChunkProcessor;
pub use scheduler::ChunkReaderScheduler;
pub use watcher::{DirectoryWatcher, PathEventListener};
