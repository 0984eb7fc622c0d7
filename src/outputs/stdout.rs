// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::io::Write;

use crate::message::Message;
use crate::outputs::{MessageOutput, OutputError};

/// Writes each message to standard output as one JSON line.
pub struct StdoutOutput {
    id: String,
    allowed_inputs: Option<HashSet<String>>,
}

impl StdoutOutput {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            allowed_inputs: None,
        }
    }

    pub fn with_allowed_inputs(mut self, inputs: HashSet<String>) -> Self {
        self.allowed_inputs = Some(inputs);
        self
    }
}

impl MessageOutput for StdoutOutput {
    fn id(&self) -> &str {
        &self.id
    }

    fn allowed_inputs(&self) -> Option<&HashSet<String>> {
        self.allowed_inputs.as_ref()
    }

    fn write(&self, message: &Message) -> Result<(), OutputError> {
        let line = serde_json::to_vec(message)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&line)?;
        handle.write_all(b"\n")?;
        Ok(())
    }
}
