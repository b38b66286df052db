// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-batch ack/retry bookkeeping.
//!
//! A [`BatchOutcome`] records the decisions application code makes while it
//! processes one batch. The first decision for a message (or for the batch as
//! a whole) wins. Conflicting later calls change nothing and log a warning.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use quiver_core::{EventOutcome, QueueResponse, QueueRetryMessage, RetryBatch};

/// Decisions recorded for one delivered batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub ack_all: bool,
    pub retry_batch: RetryBatch,
    pub explicit_acks: BTreeSet<String>,
    /// Message id to requested delay.
    pub retries: BTreeMap<String, Option<u32>>,
}

impl BatchOutcome {
    pub fn ack(&mut self, id: &str) {
        if self.ack_all {
            return;
        }

        if self.retry_batch.retry {
            warn!(
                message_id = id,
                "Received a call to ack() on message {id} after retryAll() was already called. \
                 Calling ack() on a message after calling retryAll() has no effect."
            );
            return;
        }

        if self.retries.contains_key(id) {
            warn!(
                message_id = id,
                "Received a call to ack() on message {id} after retry() was already called. \
                 Calling ack() on a message after calling retry() has no effect."
            );
            return;
        }

        if !self.explicit_acks.contains(id) {
            self.explicit_acks.insert(id.to_string());
        }
    }

    /// Marks a message for redelivery. A later call on the same id only
    /// updates the delay, and only when one is given.
    pub fn retry(&mut self, id: &str, delay_seconds: Option<u32>) {
        if self.ack_all {
            warn!(
                message_id = id,
                "Received a call to retry() on message {id} after ackAll() was already called. \
                 Calling retry() on a message after calling ackAll() has no effect."
            );
            return;
        }

        if self.explicit_acks.contains(id) {
            warn!(
                message_id = id,
                "Received a call to retry() on message {id} after ack() was already called. \
                 Calling retry() on a message after calling ack() has no effect."
            );
            return;
        }

        let entry = self.retries.entry(id.to_string()).or_default();
        if delay_seconds.is_some() {
            *entry = delay_seconds;
        }
    }

    pub fn ack_all(&mut self) {
        if self.retry_batch.retry {
            warn!(
                "Received a call to ackAll() after retryAll() was already called. \
                 Calling ackAll() after calling retryAll() has no effect."
            );
            return;
        }
        self.ack_all = true;
    }

    pub fn retry_all(&mut self, delay_seconds: Option<u32>) {
        if self.ack_all {
            warn!(
                "Received a call to retryAll() after ackAll() was already called. \
                 Calling retryAll() after calling ackAll() has no effect."
            );
            return;
        }

        self.retry_batch.retry = true;
        if delay_seconds.is_some() {
            self.retry_batch.delay_seconds = delay_seconds;
        }
    }

    pub fn explicit_acks(&self) -> Vec<String> {
        self.explicit_acks.iter().cloned().collect()
    }

    pub fn retry_messages(&self) -> Vec<QueueRetryMessage> {
        self.retries
            .iter()
            .map(|(id, delay)| QueueRetryMessage {
                msg_id: id.clone(),
                delay_seconds: *delay,
            })
            .collect()
    }

    /// Overwrites every decision with the ones carried by a dispatcher response.
    pub fn replace_with(&mut self, response: &QueueResponse) {
        self.ack_all = response.ack_all;
        self.retry_batch = response.retry_batch;

        self.explicit_acks.clear();
        self.explicit_acks
            .extend(response.explicit_acks.iter().cloned());

        self.retries.clear();
        for retry in &response.retry_messages {
            self.retries.insert(retry.msg_id.clone(), retry.delay_seconds);
        }
    }

    /// Builds the response a dispatcher returns after running a batch locally.
    pub fn to_response(&self, outcome: EventOutcome) -> QueueResponse {
        QueueResponse {
            outcome,
            ack_all: self.ack_all,
            retry_batch: self.retry_batch,
            explicit_acks: self.explicit_acks(),
            retry_messages: self.retry_messages(),
        }
    }
}

/// A [`BatchOutcome`] shared by a batch event and all of its messages.
#[derive(Debug, Clone, Default)]
pub struct SharedOutcome(Arc<Mutex<BatchOutcome>>);

impl SharedOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the outcome. A poisoned lock is recovered since every mutation
    /// leaves the record consistent.
    pub fn lock(&self) -> MutexGuard<'_, BatchOutcome> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current decisions.
    pub fn snapshot(&self) -> BatchOutcome {
        self.lock().clone()
    }
}
