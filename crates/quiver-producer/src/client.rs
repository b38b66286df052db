// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP sender for a queue binding.
//!
//! [`QueueProducer`] posts single messages to `<base>/message` and batches to
//! `<base>/batch` on the broker channel bound to the queue.

use std::borrow::Cow;

use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use quiver_codec::{BufferPolicy, Value};
use quiver_config::{CompatConfig, QuiverConfig};
use quiver_core::{ContentType, QueueError};

use crate::envelope;
use crate::types::{MessageSendRequest, SendBatchOptions, SendOptions};

// Header names must be lower case to be used as static `HeaderName`s.
pub const HDR_MSG_FORMAT: &str = "x-msg-fmt";
pub const HDR_MSG_DELAY: &str = "x-msg-delay-secs";
pub const HDR_BATCH_COUNT: &str = "cf-queue-batch-count";
pub const HDR_BATCH_BYTES: &str = "cf-queue-batch-bytes";
pub const HDR_BATCH_LARGEST: &str = "cf-queue-largest-msg";

/// Sends messages to one queue.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    client: reqwest::Client,
    base_url: Url,
    compat: CompatConfig,
}

impl QueueProducer {
    /// Builds a producer from the `[producer]` and `[compat]` sections.
    pub fn new(config: &QuiverConfig) -> Result<Self, QueueError> {
        let client = reqwest::Client::builder()
            .timeout(config.producer.request_timeout())
            .build()
            .map_err(|e| QueueError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.producer.base_url)?,
            compat: config.compat,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: &str) -> Result<Self, QueueError> {
        self.base_url = parse_base_url(url)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a single message.
    pub async fn send(&self, body: &Value, options: SendOptions) -> Result<(), QueueError> {
        if body.is_undefined() {
            return Err(QueueError::type_error("Message body cannot be undefined"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );

        let content_type = match &options.content_type {
            Some(explicit) => Some(ContentType::validate(explicit)?),
            None if self.compat.queues_json_messages => Some(ContentType::Json),
            None => None,
        };
        if let Some(content_type) = content_type {
            headers.insert(HDR_MSG_FORMAT, HeaderValue::from_static(content_type.as_str()));
        }
        if let Some(secs) = options.delay_seconds {
            headers.insert(HDR_MSG_DELAY, HeaderValue::from(secs));
        }

        // The request outlives the caller's borrow, so never reference its buffers.
        let serialized = quiver_codec::serialize(
            Cow::Borrowed(body),
            content_type.unwrap_or_default(),
            BufferPolicy::DeepCopy,
        )?;

        let len = serialized.len();
        self.post("message", "Queue send", headers, serialized.into_owned())
            .await?;
        debug!(bytes = len, "queue message sent");
        Ok(())
    }

    /// Sends a batch of messages in one request.
    pub async fn send_batch(
        &self,
        messages: &[MessageSendRequest],
        options: SendBatchOptions,
    ) -> Result<(), QueueError> {
        let envelope = envelope::encode_batch(messages, self.compat.queues_json_messages)?;

        let mut headers = HeaderMap::new();
        headers.insert(HDR_BATCH_COUNT, HeaderValue::from(envelope.message_count));
        headers.insert(HDR_BATCH_BYTES, HeaderValue::from(envelope.total_bytes));
        headers.insert(HDR_BATCH_LARGEST, HeaderValue::from(envelope.largest_message));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(secs) = options.delay_seconds {
            headers.insert(HDR_MSG_DELAY, HeaderValue::from(secs));
        }

        self.post(
            "batch",
            "Queue sendBatch",
            headers,
            envelope.body.into_bytes(),
        )
        .await?;
        debug!(
            count = envelope.message_count,
            bytes = envelope.total_bytes,
            "queue batch sent"
        );
        Ok(())
    }

    async fn post(
        &self,
        suffix: &str,
        operation: &'static str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<(), QueueError> {
        let url = self
            .base_url
            .join(suffix)
            .map_err(|e| QueueError::Internal(format!("invalid {suffix} endpoint: {e}")))?;
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| QueueError::Transport {
                message: format!("{operation} request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(QueueError::Delivery {
                operation,
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        // Read and discard so the connection goes back to the pool.
        response
            .bytes()
            .await
            .map_err(|e| QueueError::Transport {
                message: format!("{operation} response body failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

/// Parses the queue binding URL. Its path gets a trailing `/` so endpoints
/// join beneath it instead of replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url, QueueError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| QueueError::Config(format!("invalid producer base URL `{raw}`: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
