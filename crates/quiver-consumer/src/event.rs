// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The batch event handed to application code.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use quiver_core::{QueueError, QueueRequest};

use crate::message::{IncomingQueueMessage, QueueMessage, QueueRetryOptions};
use crate::outcome::{BatchOutcome, SharedOutcome};
use crate::tasks::WaitUntilTasks;

/// How far the handler call for a batch has got.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CompletionStatus {
    #[default]
    Incomplete,
    CompletedSuccessfully,
    CompletedWithError(String),
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => f.write_str("Incomplete"),
            Self::CompletedSuccessfully => f.write_str("Completed Successfully"),
            Self::CompletedWithError(e) => write!(f, "Completed with error: {e}"),
        }
    }
}

/// A delivered batch.
///
/// Clones share the same messages, outcome, and completion status.
#[derive(Debug, Clone)]
pub struct QueueEvent {
    queue_name: Arc<str>,
    messages: Arc<[QueueMessage]>,
    outcome: SharedOutcome,
    completion: Arc<Mutex<CompletionStatus>>,
    tasks: WaitUntilTasks,
}

impl QueueEvent {
    /// Builds an event from a dispatcher request, decoding every body.
    pub fn from_request(
        request: &QueueRequest,
        outcome: SharedOutcome,
        tasks: WaitUntilTasks,
    ) -> Result<Self, QueueError> {
        let messages = request
            .messages
            .iter()
            .map(|m| QueueMessage::from_rpc(m, outcome.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assemble(&request.queue_name, messages, outcome, tasks))
    }

    /// Builds an event from locally delivered messages, decoding every body.
    pub fn from_local(
        queue_name: &str,
        messages: &[IncomingQueueMessage],
        outcome: SharedOutcome,
        tasks: WaitUntilTasks,
    ) -> Result<Self, QueueError> {
        let messages = messages
            .iter()
            .map(|m| QueueMessage::from_incoming(m, outcome.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assemble(queue_name, messages, outcome, tasks))
    }

    fn assemble(
        queue_name: &str,
        messages: Vec<QueueMessage>,
        outcome: SharedOutcome,
        tasks: WaitUntilTasks,
    ) -> Self {
        Self {
            queue_name: Arc::from(queue_name),
            messages: messages.into(),
            outcome,
            completion: Arc::default(),
            tasks,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn messages(&self) -> &[QueueMessage] {
        &self.messages
    }

    pub fn ack_all(&self) {
        self.outcome.lock().ack_all();
    }

    pub fn retry_all(&self, options: QueueRetryOptions) {
        self.outcome.lock().retry_all(options.delay_seconds);
    }

    /// Keeps the invocation alive until `task` finishes.
    pub fn wait_until<F>(&self, task: F)
    where
        F: Future<Output = Result<(), QueueError>> + Send + 'static,
    {
        self.tasks.wait_until("event.waitUntil()", task);
    }

    pub fn completion_status(&self) -> CompletionStatus {
        self.completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Moves out of `Incomplete`. Later calls are ignored.
    pub(crate) fn set_completion_status(&self, status: CompletionStatus) {
        let mut current = self.completion.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == CompletionStatus::Incomplete {
            *current = status;
        }
    }

    pub fn outcome(&self) -> BatchOutcome {
        self.outcome.snapshot()
    }
}
