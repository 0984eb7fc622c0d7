// SPDX-License-Identifier: Apache-2.0

use encoding_rs::Encoding;
use regex::Regex;

use crate::inputs::file::chunk_buffer::FileChunkBuffer;
use crate::inputs::file::error::{Error, Result};
use crate::inputs::file::splitter::ExtractedRecord;

/// Splits records on a configured regular expression.
///
/// The pattern marks the *start* of each record: a match at the buffer's
/// current read position opens the record, and the next match closes it, so
/// two non-zero-width matches are needed to bound one record. Content before
/// the first match forms a record of its own.
#[derive(Debug)]
pub struct PatternSplitter {
    regex: Regex,
    encoding: &'static Encoding,
}

impl PatternSplitter {
    pub fn new(pattern: &str, encoding: &'static Encoding) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::Regex(e.to_string()))?;
        Ok(Self { regex, encoding })
    }

    pub(crate) fn next_record(
        &self,
        buffer: &mut FileChunkBuffer,
        include_remaining: bool,
    ) -> Option<ExtractedRecord> {
        let (text, raw_length) = {
            let data = buffer.unread();
            if data.is_empty() {
                return None;
            }

            match self
                .encoding
                .decode_without_bom_handling_and_without_replacement(data)
            {
                Some(decoded) => match self.record_boundary(&decoded) {
                    Some(end) => {
                        let text = decoded[..end].to_string();
                        let raw_length = self.raw_prefix_length(data, end);
                        (text, raw_length)
                    }
                    None => {
                        if !include_remaining {
                            return None;
                        }
                        (decoded.into_owned(), data.len())
                    }
                },
                None => {
                    // The buffer ends mid multi-byte character (or holds bytes
                    // the charset cannot represent). Treated as "not enough
                    // data yet"; this stalls indefinitely if no resolving
                    // bytes ever arrive.
                    if !include_remaining {
                        return None;
                    }
                    let decoded = self.encoding.decode_without_bom_handling(data).0;
                    (decoded.into_owned(), data.len())
                }
            }
        };

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

    /// Number of input bytes that decode to the first `decoded_len` bytes of
    /// the decoded text. Counted by re-decoding into a fixed-size buffer;
    /// re-encoding the text would miscount for charsets the encoder cannot
    /// produce (UTF-16 encodes back as UTF-8) and for stateful charsets.
    fn raw_prefix_length(&self, data: &[u8], decoded_len: usize) -> usize {
        let mut decoder = self.encoding.new_decoder_without_bom_handling();
        let mut dst = "\0".repeat(decoded_len);
        let (_, bytes_read, _, _) = decoder.decode_to_str(data, dst.as_mut_str(), false);
        bytes_read
    }

    /// Byte index (in decoded text) where the current record ends, if two
    /// boundaries are known. Zero-width matches cannot bound a record.
    fn record_boundary(&self, decoded: &str) -> Option<usize> {
        let mut matches = self
            .regex
            .find_iter(decoded)
            .filter(|m| m.end() > m.start());

        let first = matches.next()?;
        if first.start() > 0 {
            return Some(first.start());
        }
        matches.next().map(|m| m.start())
    }
}
