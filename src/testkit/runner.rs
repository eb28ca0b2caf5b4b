//! A [`CommandRunner`] that replays canned output.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::outbound::cli::{CommandOutput, CommandRunner, Invocation};
use crate::error::Result;

/// Records every invocation and answers with the next scripted output.
///
/// Once the script is exhausted every call succeeds with empty stdout.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outputs: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outputs(self, outputs: impl IntoIterator<Item = CommandOutput>) -> Self {
        self.outputs.lock().extend(outputs);
        self
    }

    /// Script successful outputs carrying `stdout`.
    pub fn with_stdout<'a>(self, stdout: impl IntoIterator<Item = &'a str>) -> Self {
        self.with_outputs(stdout.into_iter().map(CommandOutput::ok))
    }

    /// Invocations received so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.lock().push(invocation.clone());
        Ok(self
            .outputs
            .lock()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}
