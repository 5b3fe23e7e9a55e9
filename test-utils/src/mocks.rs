//! Mock implementations for testing.

use contract_matcher::command::{CommandInvocation, CommandOutcome};
use contract_matcher::{CommandError, CommandRegistry};
use std::collections::HashMap;
use std::sync::Mutex;

/// A recorded command call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Command name
    pub name: String,
    /// Location of the checked value
    pub path: String,
    /// The checked value
    pub value: serde_json::Value,
}

/// Command registry that records every call and answers from a script.
///
/// Commands without a scripted answer are not registered.
#[derive(Debug, Default)]
pub struct RecordingCommands {
    answers: HashMap<String, bool>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingCommands {
    /// Create a registry with no known commands.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `name` with `accepted`.
    #[must_use]
    pub fn answering(mut self, name: &str, accepted: bool) -> Self {
        self.answers.insert(name.to_string(), accepted);
        self
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }
}

impl CommandRegistry for RecordingCommands {
    fn invoke(&self, invocation: &CommandInvocation) -> Result<CommandOutcome, CommandError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                name: invocation.name().to_string(),
                path: invocation.path.clone(),
                value: invocation.value.clone(),
            });
        }
        match self.answers.get(invocation.name()) {
            Some(true) => Ok(CommandOutcome::accepted()),
            Some(false) => Ok(CommandOutcome::rejected()),
            None => Err(CommandError::NotRegistered(invocation.name().to_string())),
        }
    }
}
