// SPDX-License-Identifier: Apache-2.0

//! The immutable record produced by the extraction pipeline and the
//! single-writer builder that constructs it.

pub mod builder;
pub mod fields;
pub mod severity;

pub use builder::{BuilderError, MessageBuilder};
pub use fields::{FieldValue, MessageFields};
pub use severity::Severity;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// A single delimited, decoded unit of log content plus metadata.
///
/// Immutable once built; constructed only through [`MessageBuilder`].
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    text: String,
    source: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<Severity>,
    input_id: String,
    /// Output tags this message is restricted to. Empty means unrestricted.
    outputs: HashSet<String>,
    #[serde(skip_serializing_if = "MessageFields::is_empty")]
    fields: MessageFields,
}

impl Message {
    pub(crate) fn new(
        text: String,
        source: String,
        timestamp: DateTime<Utc>,
        level: Option<Severity>,
        input_id: String,
        outputs: HashSet<String>,
        fields: MessageFields,
    ) -> Self {
        Self {
            text,
            source,
            timestamp,
            level,
            input_id,
            outputs,
            fields,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Option<Severity> {
        self.level
    }

    pub fn input_id(&self) -> &str {
        &self.input_id
    }

    pub fn outputs(&self) -> &HashSet<String> {
        &self.outputs
    }

    pub fn fields(&self) -> &MessageFields {
        &self.fields
    }
}
