// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge between a batch and a remote dispatcher.
//!
//! The caller side forwards a batch with [`QueueCustomEvent::send_rpc`] and
//! adopts the dispatcher's decisions. The dispatcher side runs the batch
//! locally with [`LocalDispatcher`] and answers with its decisions.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::task::TaskTracker;
use tracing::debug;

use quiver_config::QuiverConfig;
use quiver_core::{CustomEventResult, EventDispatcher, QueueError, QueueRequest, QueueResponse};

use crate::custom_event::{InvocationContext, QueueCustomEvent, QueueParams};
use crate::handler::Entrypoint;

impl QueueCustomEvent {
    /// Forwards the batch to `dispatcher`.
    ///
    /// The response replaces every local decision; nothing recorded before
    /// the call survives.
    pub async fn send_rpc(
        &self,
        dispatcher: &dyn EventDispatcher,
    ) -> Result<CustomEventResult, QueueError> {
        let request = self.params.to_request()?;
        debug!(
            queue_name = %request.queue_name,
            batch_size = request.messages.len(),
            "forwarding queue event to dispatcher"
        );
        let response = dispatcher.queue(request).await?;
        self.result.lock().replace_with(&response);
        Ok(CustomEventResult::from(response.outcome))
    }
}

/// Answers dispatcher calls by running each batch against a local entrypoint.
pub struct LocalDispatcher {
    entrypoint: Arc<Entrypoint>,
    config: QuiverConfig,
    background: TaskTracker,
}

impl LocalDispatcher {
    pub fn new(entrypoint: Arc<Entrypoint>, config: QuiverConfig) -> Self {
        Self {
            entrypoint,
            config,
            background: TaskTracker::new(),
        }
    }

    /// Background work still running from earlier batches.
    pub fn background(&self) -> &TaskTracker {
        &self.background
    }
}

#[async_trait]
impl EventDispatcher for LocalDispatcher {
    async fn queue(&self, request: QueueRequest) -> Result<QueueResponse, QueueError> {
        let event = QueueCustomEvent::new(QueueParams::Rpc(request));
        let result = event
            .run(
                &self.entrypoint,
                InvocationContext::new(&self.config),
                &self.background,
            )
            .await;
        Ok(event.outcome().to_response(result.outcome))
    }
}
