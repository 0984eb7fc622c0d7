// SPDX-License-Identifier: Apache-2.0

//! Turns raw chunks into messages. One processor per input owns every
//! per-path buffer for that input, so buffers never need locking.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bounded_channel::{BoundedReceiver, BoundedSender};
use crate::inputs::file::chunk::RawChunk;
use crate::inputs::file::chunk_buffer::FileChunkBuffer;
use crate::inputs::file::splitter::ContentSplitter;
use crate::message::{Message, MessageBuilder};

pub struct ChunkProcessor {
    chunks_rx: BoundedReceiver<RawChunk>,
    messages_tx: BoundedSender<Message>,
    splitter: ContentSplitter,
    template: MessageBuilder,
    buffers: HashMap<PathBuf, FileChunkBuffer>,
}

enum Flow {
    Continue,
    Stop,
}

impl ChunkProcessor {
    pub fn new(
        chunks_rx: BoundedReceiver<RawChunk>,
        messages_tx: BoundedSender<Message>,
        splitter: ContentSplitter,
        template: MessageBuilder,
    ) -> Self {
        Self {
            chunks_rx,
            messages_tx,
            splitter,
            template,
            buffers: HashMap::new(),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                chunk = self.chunks_rx.next() => {
                    match chunk {
                        Some(chunk) => {
                            if let Flow::Stop = self.process_chunk(chunk).await {
                                break;
                            }
                        },
                        None => {
                            debug!("chunk queue closed, stopping processor");
                            break;
                        }
                    }
                },
                _ = cancel.cancelled() => break,
            }
        }
    }

    async fn process_chunk(&mut self, chunk: RawChunk) -> Flow {
        let is_final = chunk.is_final();
        let buffer = self
            .buffers
            .entry(chunk.path.clone())
            .or_insert_with(|| FileChunkBuffer::new(chunk.path.clone(), chunk.offset));

        // A gap between the buffered end and the chunk's offset means the
        // file was truncated and re-read from zero; buffered partial data
        // belongs to the old generation and is dropped.
        if chunk.offset != buffer.buffer_end_offset() {
            debug!(
                path = %chunk.path.display(),
                buffered_end = buffer.buffer_end_offset(),
                chunk_offset = chunk.offset,
                "discarding buffered data after offset discontinuity"
            );
            buffer.reset_to(chunk.offset);
        }

        if let Some(payload) = &chunk.payload {
            buffer.append(payload);
        }

        let records: Vec<_> = self.splitter.split(buffer, is_final).collect();
        buffer.discard_read_bytes();

        for record in records {
            if record.text.is_empty() {
                continue;
            }
            let message = match self.build_message(record.text, &chunk.path) {
                Ok(message) => message,
                Err(e) => {
                    warn!(path = %chunk.path.display(), error = %e, "unable to build message");
                    continue;
                }
            };
            // Blocks when the buffer is full; backpressure reaches the
            // readers through the chunk queue filling behind us
            if self.messages_tx.send(message).await.is_err() {
                debug!("message buffer closed, stopping processor");
                return Flow::Stop;
            }
        }

        if is_final {
            // End of the input in non-follow mode; the worker is done
            self.buffers.remove(&chunk.path);
            debug!(path = %chunk.path.display(), "file complete, processor finished");
            return Flow::Stop;
        }
        Flow::Continue
    }

    fn build_message(
        &self,
        text: String,
        path: &std::path::Path,
    ) -> Result<Message, crate::message::BuilderError> {
        let mut builder = self.template.copy();
        builder.text(text)?;
        builder.timestamp(Utc::now())?;
        builder.field("source_file", path.display().to_string())?;
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounded_channel::bounded;
    use crate::inputs::file::splitter::SplitterKind;
    use crate::message::FieldValue;
    use bytes::Bytes;
    use encoding_rs::UTF_8;
    use std::collections::HashSet;

    fn template() -> MessageBuilder {
        let mut builder = MessageBuilder::new();
        builder.source("file").unwrap();
        builder.input_id("test-input").unwrap();
        builder.outputs(HashSet::new()).unwrap();
        builder
    }

    fn chunk(path: &str, offset: u64, sequence: u64, payload: &[u8]) -> RawChunk {
        RawChunk {
            path: PathBuf::from(path),
            payload: Some(Bytes::copy_from_slice(payload)),
            sequence,
            offset,
        }
    }

    fn processor(
        chunks_rx: BoundedReceiver<RawChunk>,
        messages_tx: BoundedSender<Message>,
    ) -> ChunkProcessor {
        let splitter = ContentSplitter::build(SplitterKind::Newline, UTF_8, None).unwrap();
        ChunkProcessor::new(chunks_rx, messages_tx, splitter, template())
    }

    #[tokio::test]
    async fn record_spanning_two_chunks_is_one_message() {
        let (_chunks_tx, chunks_rx) = bounded(8);
        let (messages_tx, messages_rx) = bounded(8);
        let mut proc = processor(chunks_rx, messages_tx);

        proc.process_chunk(chunk("/var/log/a.log", 0, 1, b"some line"))
            .await;
        assert!(messages_rx.try_recv().is_none());

        proc.process_chunk(chunk("/var/log/a.log", 9, 2, b" with more content\n"))
            .await;
        let message = messages_rx.try_recv().unwrap();
        assert_eq!("some line with more content", message.text());
        assert_eq!("test-input", message.input_id());
        assert_eq!(
            Some(&FieldValue::from("/var/log/a.log")),
            message.fields().get("source_file")
        );
        assert!(messages_rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn empty_records_are_dropped() {
        let (_chunks_tx, chunks_rx) = bounded(8);
        let (messages_tx, messages_rx) = bounded(8);
        let mut proc = processor(chunks_rx, messages_tx);

        proc.process_chunk(chunk("/var/log/a.log", 0, 1, b"\n\nreal line\n\n"))
            .await;
        let message = messages_rx.try_recv().unwrap();
        assert_eq!("real line", message.text());
        assert!(messages_rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn interleaved_files_keep_separate_buffers() {
        let (_chunks_tx, chunks_rx) = bounded(8);
        let (messages_tx, messages_rx) = bounded(8);
        let mut proc = processor(chunks_rx, messages_tx);

        proc.process_chunk(chunk("/var/log/a.log", 0, 1, b"from a")).await;
        proc.process_chunk(chunk("/var/log/b.log", 0, 1, b"from b, complete\n"))
            .await;
        proc.process_chunk(chunk("/var/log/a.log", 6, 2, b", continued\n"))
            .await;

        let first = messages_rx.try_recv().unwrap();
        assert_eq!("from b, complete", first.text());
        let second = messages_rx.try_recv().unwrap();
        assert_eq!("from a, continued", second.text());
    }

    #[tokio::test]
    async fn offset_discontinuity_drops_stale_partial_data() {
        let (_chunks_tx, chunks_rx) = bounded(8);
        let (messages_tx, messages_rx) = bounded(8);
        let mut proc = processor(chunks_rx, messages_tx);

        // Partial record buffered, then the file is truncated and re-read
        // from zero
        proc.process_chunk(chunk("/var/log/a.log", 0, 1, b"half a reco")).await;
        proc.process_chunk(chunk("/var/log/a.log", 0, 2, b"new content\n"))
            .await;

        let message = messages_rx.try_recv().unwrap();
        assert_eq!("new content", message.text());
        assert!(messages_rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn final_chunk_flushes_open_record() {
        let (_chunks_tx, chunks_rx) = bounded(8);
        let (messages_tx, messages_rx) = bounded(8);
        let mut proc = processor(chunks_rx, messages_tx);

        proc.process_chunk(chunk("/var/log/a.log", 0, 1, b"done\ntail without newline"))
            .await;
        let sentinel = RawChunk {
            path: PathBuf::from("/var/log/a.log"),
            payload: None,
            sequence: 2,
            offset: 25,
        };
        let flow = proc.process_chunk(sentinel).await;
        assert!(matches!(flow, Flow::Stop));

        assert_eq!("done", messages_rx.try_recv().unwrap().text());
        assert_eq!(
            "tail without newline",
            messages_rx.try_recv().unwrap().text()
        );
        assert!(proc.buffers.is_empty());
    }

    #[tokio::test]
    async fn run_stops_when_chunk_queue_closes() {
        let (chunks_tx, chunks_rx) = bounded(8);
        let (messages_tx, messages_rx) = bounded(8);
        let proc = processor(chunks_rx, messages_tx);

        chunks_tx
            .send(chunk("/var/log/a.log", 0, 1, b"one line\n"))
            .await
            .unwrap();
        drop(chunks_tx);

        proc.run(CancellationToken::new()).await;
        assert_eq!("one line", messages_rx.try_recv().unwrap().text());
    }
}
