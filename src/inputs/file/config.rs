// SPDX-License-Identifier: Apache-2.0

use encoding_rs::Encoding;
use std::collections::HashSet;
use std::time::Duration;

use crate::inputs::file::error::{Error, Result};
use crate::inputs::file::splitter::SplitterKind;

pub const DEFAULT_CHUNK_SIZE: usize = 102_400;
pub const DEFAULT_READ_INTERVAL: Duration = Duration::from_millis(250);

/// Where to start reading a file followed at startup. Files discovered later
/// through filesystem events are always read from the start, since their
/// whole content is new.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadFrom {
    Start,
    #[default]
    End,
}

#[derive(Debug, Clone)]
pub struct FileInputConfig {
    /// Identifier carried on every message this input produces.
    pub id: String,
    /// Literal path or glob pattern selecting the files to tail.
    pub path_pattern: String,
    /// Charset label resolved through the WHATWG encoding registry.
    pub charset: String,
    pub splitter: SplitterKind,
    /// Record-start regex, required when `splitter` is `Pattern`.
    pub split_pattern: Option<String>,
    pub read_from: ReadFrom,
    /// Keep watching files at end of file for appended content.
    pub follow: bool,
    pub chunk_size: usize,
    pub read_interval: Duration,
    /// Value for each message's source field.
    pub source: String,
    /// Output ids messages from this input are routed to. Empty means
    /// unrestricted outputs only.
    pub outputs: HashSet<String>,
}

impl FileInputConfig {
    pub fn new(id: impl Into<String>, path_pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path_pattern: path_pattern.into(),
            charset: "utf-8".to_string(),
            splitter: SplitterKind::default(),
            split_pattern: None,
            read_from: ReadFrom::default(),
            follow: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_interval: DEFAULT_READ_INTERVAL,
            source: "file".to_string(),
            outputs: HashSet::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Config("input id must not be empty".to_string()));
        }
        if self.path_pattern.is_empty() {
            return Err(Error::Config("path pattern must not be empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be non-zero".to_string()));
        }
        if self.splitter == SplitterKind::Pattern && self.split_pattern.is_none() {
            return Err(Error::Config(
                "pattern splitter requires a split pattern".to_string(),
            ));
        }
        self.encoding()?;
        Ok(())
    }

    pub fn encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.charset.as_bytes())
            .ok_or_else(|| Error::Charset(self.charset.clone()))
    }
}
