// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::message::Message;
use crate::outputs::{MessageOutput, OutputError};

/// Discards every message it receives, counting them. Useful for measuring
/// pipeline throughput without an output in the way.
pub struct BlackholeOutput {
    id: String,
    allowed_inputs: Option<HashSet<String>>,
    written: AtomicU64,
}

impl BlackholeOutput {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            allowed_inputs: None,
            written: AtomicU64::new(0),
        }
    }

    pub fn with_allowed_inputs(mut self, inputs: HashSet<String>) -> Self {
        self.allowed_inputs = Some(inputs);
        self
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

impl MessageOutput for BlackholeOutput {
    fn id(&self) -> &str {
        &self.id
    }

    fn allowed_inputs(&self) -> Option<&HashSet<String>> {
        self.allowed_inputs.as_ref()
    }

    fn write(&self, _message: &Message) -> Result<(), OutputError> {
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
