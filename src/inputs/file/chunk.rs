// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use std::path::PathBuf;

/// A bounded slice of raw bytes read from a file in one read operation.
///
/// A chunk with no payload is the final-chunk sentinel: no more reads will
/// occur for this path (end of file reached with following disabled), and the
/// processor should flush whatever it has buffered.
#[derive(Debug, Clone)]
pub struct RawChunk {
    /// File the bytes were read from.
    pub path: PathBuf,
    /// Raw bytes, or None for the final-chunk sentinel.
    pub payload: Option<Bytes>,
    /// Monotonic per-file sequence id.
    pub sequence: u64,
    /// Offset in the file of the first payload byte.
    pub offset: u64,
}

impl RawChunk {
    pub fn is_final(&self) -> bool {
        self.payload.is_none()
    }

    pub fn len(&self) -> usize {
        self.payload.as_ref().map_or(0, |p| p.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
