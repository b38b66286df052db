// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and option types for the outbound sender.

use quiver_codec::Value;

/// Options for a single `send`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Explicit content type, validated case-insensitively.
    pub content_type: Option<String>,
    /// Delivery delay requested from the broker.
    pub delay_seconds: Option<u32>,
}

impl SendOptions {
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn delay_seconds(mut self, secs: u32) -> Self {
        self.delay_seconds = Some(secs);
        self
    }
}

/// Options applying to a whole `send_batch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendBatchOptions {
    pub delay_seconds: Option<u32>,
}

/// One message of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSendRequest {
    pub body: Value,
    pub content_type: Option<String>,
    pub delay_seconds: Option<u32>,
}

impl MessageSendRequest {
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            delay_seconds: None,
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn delay_seconds(mut self, secs: u32) -> Self {
        self.delay_seconds = Some(secs);
        self
    }
}
