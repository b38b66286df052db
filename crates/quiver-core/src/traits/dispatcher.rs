// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote dispatcher trait for running a batch in another process.

use async_trait::async_trait;

use crate::error::QueueError;
use crate::rpc::{QueueRequest, QueueResponse};

/// Call/response primitive for the dispatcher that actually runs the batch.
#[async_trait]
pub trait EventDispatcher: Send + Sync + 'static {
    /// Delivers the batch and waits for its outcome and ack/retry decisions.
    async fn queue(&self, request: QueueRequest) -> Result<QueueResponse, QueueError>;
}
