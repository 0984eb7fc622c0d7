// SPDX-License-Identifier: Apache-2.0

//! Message destinations and the router that fans messages out to them.

pub mod blackhole;
pub mod router;
pub mod stdout;

pub use blackhole::BlackholeOutput;
pub use router::OutputRouter;
pub use stdout::StdoutOutput;

use std::collections::HashSet;
use thiserror::Error;

use crate::message::Message;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A destination for messages. Writes are synchronous and invoked from the
/// buffer processor thread.
pub trait MessageOutput: Send + Sync {
    fn id(&self) -> &str;

    /// Input ids this output accepts messages from. `None` (or an empty set)
    /// means the output is unrestricted.
    fn allowed_inputs(&self) -> Option<&HashSet<String>> {
        None
    }

    fn write(&self, message: &Message) -> Result<(), OutputError>;
}
