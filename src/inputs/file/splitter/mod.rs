// SPDX-License-Identifier: Apache-2.0

//! Record boundary detection over accumulated bytes.
//!
//! Splitters operate as lazy pull iterators over a [`FileChunkBuffer`]: each
//! call to `next` either consumes one complete record from the buffer or
//! stops, leaving partial trailing data for the next read to complete. A
//! fresh `split` call re-scans from the buffer's current read position.

pub mod newline;
pub mod pattern;

pub use newline::NewlineSplitter;
pub use pattern::PatternSplitter;

use encoding_rs::Encoding;
use std::path::PathBuf;

use crate::inputs::file::chunk_buffer::FileChunkBuffer;
use crate::inputs::file::error::{Error, Result};

/// Which record boundary detector an input uses. A closed set: adding a
/// variant means adding a constructor arm in [`ContentSplitter::build`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitterKind {
    #[default]
    Newline,
    Pattern,
}

/// One delimited record extracted from a buffer. Offsets are relative to the
/// real file, independent of in-memory buffer compaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub text: String,
    pub path: PathBuf,
    /// Offset in the file of the record's first raw byte.
    pub offset: u64,
    /// Number of raw bytes consumed for this record, delimiter included.
    pub raw_length: usize,
}

#[derive(Debug)]
pub enum ContentSplitter {
    Newline(NewlineSplitter),
    Pattern(PatternSplitter),
}

impl ContentSplitter {
    pub fn build(
        kind: SplitterKind,
        encoding: &'static Encoding,
        pattern: Option<&str>,
    ) -> Result<Self> {
        match kind {
            SplitterKind::Newline => Ok(ContentSplitter::Newline(NewlineSplitter::new(encoding))),
            SplitterKind::Pattern => {
                let pattern = pattern.ok_or_else(|| {
                    Error::Config("pattern splitter requires a split pattern".to_string())
                })?;
                Ok(ContentSplitter::Pattern(PatternSplitter::new(
                    pattern, encoding,
                )?))
            }
        }
    }

    /// Lazily extract complete records from the buffer's current read
    /// position. With `include_remaining` set, whatever trails the last
    /// delimiter is flushed as a final record; used only when a file reached
    /// end of file with following disabled.
    pub fn split<'a>(
        &'a self,
        buffer: &'a mut FileChunkBuffer,
        include_remaining: bool,
    ) -> Splits<'a> {
        Splits {
            splitter: self,
            buffer,
            include_remaining,
        }
    }
}

pub struct Splits<'a> {
    splitter: &'a ContentSplitter,
    buffer: &'a mut FileChunkBuffer,
    include_remaining: bool,
}

impl Iterator for Splits<'_> {
    type Item = ExtractedRecord;

    fn next(&mut self) -> Option<ExtractedRecord> {
        match self.splitter {
            ContentSplitter::Newline(s) => s.next_record(self.buffer, self.include_remaining),
            ContentSplitter::Pattern(s) => s.next_record(self.buffer, self.include_remaining),
        }
    }
}
