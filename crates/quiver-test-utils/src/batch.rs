// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for test batches.

use chrono::{DateTime, Utc};

use quiver_consumer::{IncomingQueueMessage, LocalQueueParams, QueueParams};
use quiver_core::{ContentType, QueueError, QueueRequest};

/// Accumulates messages for one batch.
///
/// Message timestamps are fixed so assertions stay deterministic.
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    queue_name: String,
    messages: Vec<IncomingQueueMessage>,
}

impl BatchBuilder {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            messages: Vec::new(),
        }
    }

    /// A message with raw body bytes and an optional content-type tag.
    pub fn message(
        mut self,
        id: impl Into<String>,
        body: impl Into<Vec<u8>>,
        content_type: Option<ContentType>,
    ) -> Self {
        let index = self.messages.len() as i64;
        self.messages.push(IncomingQueueMessage {
            id: id.into(),
            timestamp: Self::timestamp(index),
            body: body.into(),
            content_type,
            attempts: 1,
        });
        self
    }

    pub fn text(self, id: impl Into<String>, body: &str) -> Self {
        self.message(id, body.as_bytes(), Some(ContentType::Text))
    }

    pub fn json(self, id: impl Into<String>, body: serde_json::Value) -> Self {
        self.message(id, body.to_string().into_bytes(), Some(ContentType::Json))
    }

    /// `n` text messages with ids `m1..=mn`.
    pub fn texts(mut self, n: usize) -> Self {
        for i in 1..=n {
            self = self.text(format!("m{i}"), &format!("body {i}"));
        }
        self
    }

    /// Sets the delivery attempt count on the most recent message.
    pub fn attempts(mut self, attempts: u16) -> Self {
        if let Some(last) = self.messages.last_mut() {
            last.attempts = attempts;
        }
        self
    }

    pub fn build_local(self) -> QueueParams {
        QueueParams::Local(LocalQueueParams {
            queue_name: self.queue_name,
            messages: self.messages,
        })
    }

    pub fn build_request(self) -> Result<QueueRequest, QueueError> {
        self.build_local().to_request()
    }

    pub fn build_rpc(self) -> Result<QueueParams, QueueError> {
        Ok(QueueParams::Rpc(self.build_request()?))
    }

    fn timestamp(index: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(1_700_000_000_000_000_000 + index * 1_000)
    }
}
