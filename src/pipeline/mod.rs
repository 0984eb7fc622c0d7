// SPDX-License-Identifier: Apache-2.0

//! The bounded message buffer between inputs and outputs.
//!
//! Inputs publish messages into a bounded channel; a dedicated processor
//! thread drains it and hands each message to every registered consumer in
//! turn. Delivery is synchronous, so a slow consumer fills the buffer and
//! backpressure propagates to the inputs.

use std::thread::JoinHandle;
use tracing::{debug, warn};

use crate::bounded_channel::BoundedReceiver;
use crate::message::Message;

/// Synchronous sink for messages draining from the buffer. Invoked from the
/// buffer processor thread, one message at a time.
pub trait MessageConsumer: Send {
    fn process(&self, message: &Message);
}

pub struct BufferProcessor {
    messages_rx: BoundedReceiver<Message>,
    consumers: Vec<Box<dyn MessageConsumer>>,
}

impl BufferProcessor {
    pub fn new(
        messages_rx: BoundedReceiver<Message>,
        consumers: Vec<Box<dyn MessageConsumer>>,
    ) -> Self {
        Self {
            messages_rx,
            consumers,
        }
    }

    /// Run the drain loop on its own OS thread. The thread exits when every
    /// message sender is dropped and the buffer is empty.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("buffer-processor".to_string())
            .spawn(move || self.run())
    }

    fn run(self) {
        loop {
            match self.messages_rx.recv_blocking() {
                Some(message) => {
                    for consumer in &self.consumers {
                        consumer.process(&message);
                    }
                }
                None => {
                    debug!("message buffer closed, processor exiting");
                    break;
                }
            }
        }
        if !self.messages_rx.is_empty() {
            warn!("buffer processor exited with messages remaining");
        }
    }
}
