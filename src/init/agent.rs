// SPDX-License-Identifier: Apache-2.0

//! Agent assembly and lifecycle.
//!
//! Shutdown is phased: inputs are cancelled first and drained, which drops
//! the last message sender and lets the buffer processor thread run the
//! buffer dry before exiting. The filesystem watcher stops last.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, warn};

use crate::bounded_channel::bounded;
use crate::init::args::{AgentRun, OutputKind};
use crate::init::wait;
use crate::inputs::file::input::FileInput;
use crate::inputs::file::watcher::DirectoryWatcher;
use crate::outputs::{BlackholeOutput, MessageOutput, OutputRouter, StdoutOutput};
use crate::pipeline::BufferProcessor;

const WATCHER_POLL_TIMEOUT: Duration = Duration::from_millis(100);
const INPUTS_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Agent {
    args: Box<AgentRun>,
}

impl Agent {
    pub fn new(args: Box<AgentRun>) -> Self {
        Self { args }
    }

    pub async fn run(self, agent_cancel: CancellationToken) -> Result<(), BoxError> {
        let (messages_tx, messages_rx) = bounded(self.args.message_buffer_size);

        let mut outputs: Vec<Arc<dyn MessageOutput>> = Vec::new();
        for kind in &self.args.outputs {
            match kind {
                OutputKind::Stdout => outputs.push(Arc::new(StdoutOutput::new("stdout"))),
                OutputKind::Blackhole => outputs.push(Arc::new(BlackholeOutput::new("blackhole"))),
            }
        }
        let router = OutputRouter::new(outputs);

        let buffer_handle = BufferProcessor::new(messages_rx, vec![Box::new(router)])
            .spawn()
            .map_err(|e| -> BoxError { format!("unable to start buffer processor: {e}").into() })?;

        let mut watcher = DirectoryWatcher::spawn(WATCHER_POLL_TIMEOUT)?;

        let mut input_tasks = JoinSet::new();
        let inputs_cancel = CancellationToken::new();

        let input = FileInput::new(self.args.file_input_config(), messages_tx)?;
        input.start(&mut input_tasks, inputs_cancel.clone(), &watcher)?;

        let result = tokio::select! {
            _ = agent_cancel.cancelled() => {
                debug!("agent cancellation signaled");
                Ok(())
            },
            e = wait::wait_for_any_task(&mut input_tasks) => {
                // With following disabled inputs can legitimately finish on
                // their own; anything else is unexpected
                match e {
                    Ok(()) => {
                        debug!("input finished");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            },
        };

        // Cancel inputs and wait for them to drain. Their exit drops the
        // last message sender, closing the buffer.
        inputs_cancel.cancel();
        if let Err(e) =
            wait::wait_for_tasks_with_timeout(&mut input_tasks, INPUTS_DRAIN_TIMEOUT).await
        {
            warn!(error = %e, "inputs did not stop cleanly");
        }

        // The buffer processor exits once the buffer is closed and empty
        let joined = tokio::task::spawn_blocking(move || buffer_handle.join()).await;
        if !matches!(joined, Ok(Ok(()))) {
            warn!("buffer processor did not stop cleanly");
        }

        watcher.shutdown();

        result
    }
}
