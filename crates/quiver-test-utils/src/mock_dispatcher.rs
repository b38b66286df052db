// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock event dispatcher for deterministic bridge tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use quiver_core::{
    EventDispatcher, EventOutcome, QueueError, QueueRequest, QueueResponse, RetryBatch,
};

enum Scripted {
    Respond(QueueResponse),
    Fail(String),
}

/// A dispatcher that answers from a FIFO script and records every request.
///
/// When the script is empty it answers `OK` with no decisions.
#[derive(Clone, Default)]
pub struct MockDispatcher {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<QueueRequest>>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<QueueResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(
                responses.into_iter().map(Scripted::Respond).collect(),
            )),
            requests: Arc::default(),
        }
    }

    pub async fn push_response(&self, response: QueueResponse) {
        self.script.lock().await.push_back(Scripted::Respond(response));
    }

    /// The next call fails with [`QueueError::Rpc`].
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Fail(message.into()));
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<QueueRequest> {
        self.requests.lock().await.clone()
    }

    /// An `OK` response with no decisions.
    pub fn empty_response() -> QueueResponse {
        QueueResponse {
            outcome: EventOutcome::Ok,
            ack_all: false,
            retry_batch: RetryBatch::default(),
            explicit_acks: Vec::new(),
            retry_messages: Vec::new(),
        }
    }
}

#[async_trait]
impl EventDispatcher for MockDispatcher {
    async fn queue(&self, request: QueueRequest) -> Result<QueueResponse, QueueError> {
        self.requests.lock().await.push(request);
        match self.script.lock().await.pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(QueueError::Rpc {
                message,
                source: None,
            }),
            None => Ok(Self::empty_response()),
        }
    }
}
