// SPDX-License-Identifier: Apache-2.0

//! Per-path accumulation of raw bytes across reads.
//!
//! Logical file offsets and physical buffer positions are tracked as separate
//! fields so that compacting consumed bytes never disturbs offset
//! bookkeeping. The invariant `file_offset + readable == buffer_end_offset`
//! holds at all times. A buffer is owned and mutated by exactly one chunk
//! processor; there is no internal locking.

use bytes::{Buf, BytesMut};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileChunkBuffer {
    path: PathBuf,
    buf: BytesMut,
    /// Offset in the file of the first byte held in `buf`.
    base_offset: u64,
    /// Read cursor within `buf`; bytes before it are consumed.
    read_pos: usize,
}

impl FileChunkBuffer {
    pub fn new(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            buf: BytesMut::new(),
            base_offset: offset,
            read_pos: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset in the file of the first unread byte.
    pub fn file_offset(&self) -> u64 {
        self.base_offset + self.read_pos as u64
    }

    /// Offset in the file just past the last buffered byte.
    pub fn buffer_end_offset(&self) -> u64 {
        self.base_offset + self.buf.len() as u64
    }

    /// Number of buffered bytes not yet consumed.
    pub fn readable(&self) -> usize {
        self.buf.len() - self.read_pos
    }

    pub fn is_empty(&self) -> bool {
        self.readable() == 0
    }

    /// The unread bytes.
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.read_pos..]
    }

    /// Append newly read bytes to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Advance the read cursor by `n` bytes, moving `file_offset` forward.
    ///
    /// # Panics
    /// Panics if `n` exceeds the readable byte count.
    pub fn skip(&mut self, n: usize) {
        assert!(n <= self.readable(), "skip past end of buffer");
        self.read_pos += n;
    }

    /// Compact consumed bytes out of the underlying storage. File offsets are
    /// unaffected: the base offset absorbs the discarded span.
    pub fn discard_read_bytes(&mut self) {
        if self.read_pos == 0 {
            return;
        }
        self.buf.advance(self.read_pos);
        self.base_offset += self.read_pos as u64;
        self.read_pos = 0;
    }

    /// Drop all buffered bytes and restart bookkeeping at `offset`. Used when
    /// the file behind this buffer was truncated.
    pub fn reset_to(&mut self, offset: u64) {
        self.buf.clear();
        self.base_offset = offset;
        self.read_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(buffer: &FileChunkBuffer) {
        assert_eq!(
            buffer.buffer_end_offset(),
            buffer.file_offset() + buffer.readable() as u64
        );
    }

    #[test]
    fn append_and_skip_track_offsets() {
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 100);
        assert_eq!(100, buffer.file_offset());
        assert_eq!(100, buffer.buffer_end_offset());

        buffer.append(b"hello\nworld\n");
        assert_eq!(100, buffer.file_offset());
        assert_eq!(112, buffer.buffer_end_offset());
        assert_invariant(&buffer);

        buffer.skip(6);
        assert_eq!(106, buffer.file_offset());
        assert_eq!(b"world\n", buffer.unread());
        assert_invariant(&buffer);
    }

    #[test]
    fn discard_preserves_logical_offsets() {
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);
        buffer.append(b"first\nsecond");
        buffer.skip(6);

        let offset_before = buffer.file_offset();
        let end_before = buffer.buffer_end_offset();
        buffer.discard_read_bytes();

        assert_eq!(offset_before, buffer.file_offset());
        assert_eq!(end_before, buffer.buffer_end_offset());
        assert_eq!(b"second", buffer.unread());
        assert_invariant(&buffer);
    }

    #[test]
    fn discard_with_nothing_read_is_a_noop() {
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 50);
        buffer.append(b"abc");
        buffer.discard_read_bytes();
        assert_eq!(50, buffer.file_offset());
        assert_eq!(b"abc", buffer.unread());
    }

    #[test]
    fn reset_restarts_bookkeeping() {
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);
        buffer.append(b"stale data past truncation");
        buffer.skip(5);

        buffer.reset_to(0);
        assert_eq!(0, buffer.file_offset());
        assert_eq!(0, buffer.readable());
        assert_invariant(&buffer);

        buffer.append(b"fresh\n");
        assert_eq!(6, buffer.buffer_end_offset());
    }

    #[test]
    #[should_panic(expected = "skip past end of buffer")]
    fn skip_past_end_panics() {
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);
        buffer.append(b"ab");
        buffer.skip(3);
    }
}
