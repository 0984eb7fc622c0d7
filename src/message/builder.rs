// SPDX-License-Identifier: Apache-2.0

//! Mutable staging object for [`Message`] construction.
//!
//! A builder is bound to the thread that created it: every mutation checks
//! the calling thread and fails fast on a mismatch instead of silently
//! racing. To hand a template across a worker boundary, call [`copy`], which
//! deep-copies the staged state and re-binds ownership to the calling thread.
//!
//! [`copy`]: MessageBuilder::copy

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::thread::{self, ThreadId};
use thiserror::Error;

use super::fields::{FieldValue, MessageFields};
use super::severity::Severity;
use super::Message;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("builder owned by thread {owner:?} mutated from thread {caller:?}")]
    ForeignThread { owner: ThreadId, caller: ThreadId },

    #[error("required field not set: {0}")]
    Incomplete(&'static str),
}

#[derive(Debug)]
pub struct MessageBuilder {
    owner: ThreadId,
    text: Option<String>,
    source: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    level: Option<Severity>,
    input_id: Option<String>,
    outputs: Option<HashSet<String>>,
    fields: MessageFields,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            text: None,
            source: None,
            timestamp: None,
            level: None,
            input_id: None,
            outputs: None,
            fields: MessageFields::new(),
        }
    }

    /// Produce an independently-owned builder with a deep copy of the staged
    /// state, bound to the calling thread. This is the only sanctioned way to
    /// move a template across a worker boundary.
    pub fn copy(&self) -> MessageBuilder {
        MessageBuilder {
            owner: thread::current().id(),
            text: self.text.clone(),
            source: self.source.clone(),
            timestamp: self.timestamp,
            level: self.level,
            input_id: self.input_id.clone(),
            outputs: self.outputs.clone(),
            fields: self.fields.clone(),
        }
    }

    fn check_owner(&self) -> Result<(), BuilderError> {
        let caller = thread::current().id();
        if caller != self.owner {
            return Err(BuilderError::ForeignThread {
                owner: self.owner,
                caller,
            });
        }
        Ok(())
    }

    pub fn text(&mut self, text: impl Into<String>) -> Result<&mut Self, BuilderError> {
        self.check_owner()?;
        self.text = Some(text.into());
        Ok(self)
    }

    pub fn source(&mut self, source: impl Into<String>) -> Result<&mut Self, BuilderError> {
        self.check_owner()?;
        self.source = Some(source.into());
        Ok(self)
    }

    pub fn timestamp(&mut self, timestamp: DateTime<Utc>) -> Result<&mut Self, BuilderError> {
        self.check_owner()?;
        self.timestamp = Some(timestamp);
        Ok(self)
    }

    pub fn level(&mut self, level: Severity) -> Result<&mut Self, BuilderError> {
        self.check_owner()?;
        self.level = Some(level);
        Ok(self)
    }

    pub fn input_id(&mut self, input_id: impl Into<String>) -> Result<&mut Self, BuilderError> {
        self.check_owner()?;
        self.input_id = Some(input_id.into());
        Ok(self)
    }

    pub fn outputs(&mut self, outputs: HashSet<String>) -> Result<&mut Self, BuilderError> {
        self.check_owner()?;
        self.outputs = Some(outputs);
        Ok(self)
    }

    pub fn field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, BuilderError> {
        self.check_owner()?;
        self.fields.insert(key, value);
        Ok(self)
    }

    /// Validate required fields and construct the immutable message.
    /// Level and fields are optional; everything else must be set.
    pub fn build(&self) -> Result<Message, BuilderError> {
        self.check_owner()?;

        let text = self
            .text
            .clone()
            .ok_or(BuilderError::Incomplete("text"))?;
        let source = self
            .source
            .clone()
            .ok_or(BuilderError::Incomplete("source"))?;
        let timestamp = self
            .timestamp
            .ok_or(BuilderError::Incomplete("timestamp"))?;
        let input_id = self
            .input_id
            .clone()
            .ok_or(BuilderError::Incomplete("input_id"))?;
        let outputs = self
            .outputs
            .clone()
            .ok_or(BuilderError::Incomplete("outputs"))?;

        Ok(Message::new(
            text,
            source,
            timestamp,
            self.level,
            input_id,
            outputs,
            self.fields.clone(),
        ))
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> MessageBuilder {
        let mut builder = MessageBuilder::new();
        builder
            .text("line")
            .unwrap()
            .source("host")
            .unwrap()
            .timestamp(Utc::now())
            .unwrap()
            .input_id("input-1")
            .unwrap()
            .outputs(HashSet::new())
            .unwrap();
        builder
    }

    #[test]
    fn build_requires_all_mandatory_fields() {
        let mut builder = MessageBuilder::new();
        assert_eq!(Err(BuilderError::Incomplete("text")), builder.build().map(|_| ()));

        builder.text("line").unwrap();
        assert_eq!(
            Err(BuilderError::Incomplete("source")),
            builder.build().map(|_| ())
        );

        let builder = complete_builder();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn mutation_from_foreign_thread_fails() {
        let builder = complete_builder();

        let result = std::thread::spawn(move || {
            let mut builder = builder;
            builder.text("changed").map(|_| ())
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(BuilderError::ForeignThread { .. })));
    }

    #[test]
    fn copy_reowns_to_calling_thread() {
        let builder = complete_builder();

        let message = std::thread::spawn(move || {
            let mut copied = builder.copy();
            copied.text("from the worker").unwrap();
            copied.build().unwrap()
        })
        .join()
        .unwrap();

        assert_eq!("from the worker", message.text());
    }

    #[test]
    fn copy_is_independent() {
        let mut original = complete_builder();
        original.field("shared", "before").unwrap();

        let mut copied = original.copy();
        copied.field("shared", "after").unwrap();

        let original_message = original.build().unwrap();
        let copied_message = copied.build().unwrap();

        assert_eq!(
            Some(&FieldValue::from("before")),
            original_message.fields().get("shared")
        );
        assert_eq!(
            Some(&FieldValue::from("after")),
            copied_message.fields().get("shared")
        );
    }
}
