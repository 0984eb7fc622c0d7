// SPDX-License-Identifier: Apache-2.0

use encoding_rs::Encoding;

use crate::inputs::file::chunk_buffer::FileChunkBuffer;
use crate::inputs::file::splitter::ExtractedRecord;

/// Splits records on LF, stripping a trailing CR so CRLF streams work too.
/// Delimiters may straddle read boundaries; a buffer without an LF simply
/// yields nothing until more bytes arrive.
#[derive(Debug)]
pub struct NewlineSplitter {
    encoding: &'static Encoding,
}

impl NewlineSplitter {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { encoding }
    }

    pub(crate) fn next_record(
        &self,
        buffer: &mut FileChunkBuffer,
        include_remaining: bool,
    ) -> Option<ExtractedRecord> {
        let data = buffer.unread();
        if data.is_empty() {
            return None;
        }

        let (line_end, raw_length) = match data.iter().position(|&b| b == b'\n') {
            Some(lf) => {
                // Strip a trailing CR from the record text, not the raw span
                let end = if lf > 0 && data[lf - 1] == b'\r' {
                    lf - 1
                } else {
                    lf
                };
                (end, lf + 1)
            }
            None => {
                if !include_remaining {
                    return None;
                }
                (data.len(), data.len())
            }
        };

        let text = self
            .encoding
            .decode_without_bom_handling(&data[..line_end])
            .0
            .into_owned();
        let offset = buffer.file_offset();
        let path = buffer.path().to_path_buf();
        buffer.skip(raw_length);

        Some(ExtractedRecord {
            text,
            path,
            offset,
            raw_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::file::splitter::ContentSplitter;
    use encoding_rs::{UTF_8, WINDOWS_1252};

    fn newline() -> ContentSplitter {
        ContentSplitter::Newline(NewlineSplitter::new(UTF_8))
    }

    #[test]
    fn splits_complete_lines() {
        let splitter = newline();
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);
        buffer.append(b"first\nsecond\nthird");

        let records: Vec<_> = splitter.split(&mut buffer, false).collect();
        assert_eq!(2, records.len());
        assert_eq!("first", records[0].text);
        assert_eq!(0, records[0].offset);
        assert_eq!(6, records[0].raw_length);
        assert_eq!("second", records[1].text);
        assert_eq!(6, records[1].offset);

        // Trailing partial record stays buffered
        assert_eq!(b"third", buffer.unread());
    }

    #[test]
    fn record_split_across_chunk_boundary() {
        let splitter = newline();
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);

        buffer.append(b"some line");
        assert_eq!(0, splitter.split(&mut buffer, false).count());

        buffer.append(b" with more content\n");
        let records: Vec<_> = splitter.split(&mut buffer, false).collect();
        assert_eq!(1, records.len());
        assert_eq!("some line with more content", records[0].text);
        assert_eq!(0, records[0].offset);
        assert_eq!(28, records[0].raw_length);
    }

    #[test]
    fn empty_lines_yield_empty_records() {
        // Zero-length records are produced here and filtered by the caller
        let splitter = newline();
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);
        buffer.append(b"\n\n\n");

        let records: Vec<_> = splitter.split(&mut buffer, false).collect();
        assert_eq!(3, records.len());
        assert!(records.iter().all(|r| r.text.is_empty()));
        assert!(records.iter().all(|r| r.raw_length == 1));
    }

    #[test]
    fn strips_carriage_return() {
        let splitter = newline();
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);
        buffer.append(b"windows line\r\nnext");

        let records: Vec<_> = splitter.split(&mut buffer, false).collect();
        assert_eq!(1, records.len());
        assert_eq!("windows line", records[0].text);
        // Raw span covers CR and LF
        assert_eq!(14, records[0].raw_length);
    }

    #[test]
    fn flush_emits_remainder_without_delimiter() {
        let splitter = newline();
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 10);
        buffer.append(b"line\ntail without newline");

        let records: Vec<_> = splitter.split(&mut buffer, true).collect();
        assert_eq!(2, records.len());
        assert_eq!("line", records[0].text);
        assert_eq!("tail without newline", records[1].text);
        assert_eq!(15, records[1].offset);
        assert!(buffer.is_empty());
    }

    #[test]
    fn decodes_with_configured_encoding() {
        let splitter = ContentSplitter::Newline(NewlineSplitter::new(WINDOWS_1252));
        let mut buffer = FileChunkBuffer::new("/tmp/a.log", 0);
        // 0xE9 is 'é' in windows-1252
        buffer.append(b"caf\xE9\n");

        let records: Vec<_> = splitter.split(&mut buffer, false).collect();
        assert_eq!("café", records[0].text);
        assert_eq!(5, records[0].raw_length);
    }
}
