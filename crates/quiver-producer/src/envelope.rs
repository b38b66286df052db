// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch envelope encoding.
//!
//! The envelope is written directly into a pre-sized string instead of going
//! through a JSON value tree:
//!
//! ```text
//! {"messages":[{"body":"<base64>","contentType":"json","delaySecs":5},...]}
//! ```

use std::borrow::Cow;
use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use quiver_codec::{BufferPolicy, Serialized};
use quiver_core::{ContentType, QueueError};

use crate::types::MessageSendRequest;

/// An encoded batch plus the accounting the broker uses for size limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEnvelope {
    pub body: String,
    pub message_count: usize,
    /// Sum of serialized body sizes, before base64.
    pub total_bytes: usize,
    /// Largest serialized body size, before base64.
    pub largest_message: usize,
}

struct EncodedMessage<'a> {
    body: Serialized<'a>,
    content_type: Option<ContentType>,
    delay_seconds: Option<u32>,
}

/// Serializes and encodes a batch. Message order is preserved.
pub fn encode_batch(
    messages: &[MessageSendRequest],
    json_by_default: bool,
) -> Result<BatchEnvelope, QueueError> {
    if messages.is_empty() {
        return Err(QueueError::type_error(
            "sendBatch() requires at least one message",
        ));
    }

    let mut total_bytes = 0;
    let mut largest_message = 0;
    let mut encoded = Vec::with_capacity(messages.len());
    for message in messages {
        if message.body.is_undefined() {
            return Err(QueueError::type_error("Message body cannot be undefined"));
        }

        let content_type = match &message.content_type {
            Some(explicit) => Some(ContentType::validate(explicit)?),
            None if json_by_default => Some(ContentType::Json),
            None => None,
        };
        // The batch is encoded before anything else can touch the values.
        let body = quiver_codec::serialize(
            Cow::Borrowed(&message.body),
            content_type.unwrap_or_default(),
            BufferPolicy::ShallowReference,
        )?;

        total_bytes += body.len();
        largest_message = largest_message.max(body.len());
        encoded.push(EncodedMessage {
            body,
            content_type,
            delay_seconds: message.delay_seconds,
        });
    }

    let capacity = estimated_size(total_bytes, encoded.len());
    let mut body = String::with_capacity(capacity);
    body.push_str("{\"messages\":[");
    for (i, message) in encoded.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        body.push_str("{\"body\":\"");
        STANDARD.encode_string(message.body.as_bytes(), &mut body);
        body.push('"');
        if let Some(content_type) = message.content_type {
            body.push_str(",\"contentType\":\"");
            body.push_str(content_type.as_str());
            body.push('"');
        }
        if let Some(secs) = message.delay_seconds {
            let _ = write!(body, ",\"delaySecs\":{secs}");
        }
        body.push('}');
    }
    body.push_str("]}");
    debug_assert!(body.len() <= capacity);

    Ok(BatchEnvelope {
        body,
        message_count: encoded.len(),
        total_bytes,
        largest_message,
    })
}

/// Upper bound on the envelope size: base64 growth plus per-message framing.
fn estimated_size(total_bytes: usize, count: usize) -> usize {
    total_bytes.div_ceil(3) * 4 + count * 64 + 32
}
