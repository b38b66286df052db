// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages as seen by the consumer.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use quiver_codec::Value;
use quiver_core::{ContentType, QueueError, RpcQueueMessage};

use crate::outcome::SharedOutcome;

/// A message handed to the consumer by the local host, not over RPC.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingQueueMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub body: Vec<u8>,
    /// `None` reads as [`ContentType::V8`].
    pub content_type: Option<ContentType>,
    pub attempts: u16,
}

impl IncomingQueueMessage {
    /// Encodes this message for a dispatcher call.
    pub fn to_rpc(&self) -> Result<RpcQueueMessage, QueueError> {
        let timestamp_ns = self.timestamp.timestamp_nanos_opt().ok_or_else(|| {
            QueueError::Internal(format!(
                "timestamp of message {} is out of range: {}",
                self.id, self.timestamp
            ))
        })?;
        Ok(RpcQueueMessage {
            id: self.id.clone(),
            timestamp_ns,
            data: self.body.clone(),
            content_type: self
                .content_type
                .map(|ct| ct.as_str().to_string())
                .unwrap_or_default(),
            attempts: self.attempts,
        })
    }
}

/// Options for [`QueueMessage::retry`] and `retry_all`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueRetryOptions {
    pub delay_seconds: Option<u32>,
}

impl QueueRetryOptions {
    pub fn delay(secs: u32) -> Self {
        Self {
            delay_seconds: Some(secs),
        }
    }
}

/// One message of a delivered batch.
///
/// The body is decoded when the batch is built, so it never refers back to
/// the delivery buffers. Cloning is cheap and every clone records its
/// decisions in the same batch outcome.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    id: String,
    timestamp: DateTime<Utc>,
    body: Arc<Value>,
    attempts: u16,
    outcome: SharedOutcome,
}

impl QueueMessage {
    pub(crate) fn from_rpc(
        message: &RpcQueueMessage,
        outcome: SharedOutcome,
    ) -> Result<Self, QueueError> {
        let content_type = ContentType::from_wire(Some(&message.content_type))?;
        Ok(Self {
            id: message.id.clone(),
            timestamp: DateTime::from_timestamp_nanos(message.timestamp_ns),
            body: Arc::new(quiver_codec::deserialize(&message.data, content_type)?),
            attempts: message.attempts,
            outcome,
        })
    }

    pub(crate) fn from_incoming(
        message: &IncomingQueueMessage,
        outcome: SharedOutcome,
    ) -> Result<Self, QueueError> {
        let content_type = message.content_type.unwrap_or_default();
        Ok(Self {
            id: message.id.clone(),
            timestamp: message.timestamp,
            body: Arc::new(quiver_codec::deserialize(&message.body, content_type)?),
            attempts: message.attempts,
            outcome,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Shared handle to the decoded body.
    pub fn body_handle(&self) -> Arc<Value> {
        Arc::clone(&self.body)
    }

    pub fn attempts(&self) -> u16 {
        self.attempts
    }

    pub fn ack(&self) {
        self.outcome.lock().ack(&self.id);
    }

    pub fn retry(&self, options: QueueRetryOptions) {
        self.outcome.lock().retry(&self.id, options.delay_seconds);
    }
}
