// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handlers and listeners assembled from closures.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use quiver_consumer::{Env, ExecutionContext, QueueEvent, QueueHandler, QueueListener};
use quiver_core::QueueError;

/// A `queue()` handler that delegates to a closure returning a future.
pub struct FnHandler<F> {
    f: F,
    calls: AtomicUsize,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(QueueEvent, ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), QueueError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self {
            f,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F, Fut> QueueHandler for FnHandler<F>
where
    F: Fn(QueueEvent, ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), QueueError>> + Send + 'static,
{
    async fn queue(
        &self,
        batch: QueueEvent,
        _env: Env,
        ctx: ExecutionContext,
    ) -> Result<(), QueueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.f)(batch, ctx).await
    }
}

/// A `queue()` handler whose call never settles.
pub struct NeverSettles;

#[async_trait]
impl QueueHandler for NeverSettles {
    async fn queue(
        &self,
        _batch: QueueEvent,
        _env: Env,
        _ctx: ExecutionContext,
    ) -> Result<(), QueueError> {
        std::future::pending().await
    }
}

/// A `queue` event listener that delegates to a closure.
pub struct FnListener<F> {
    f: F,
    calls: AtomicUsize,
}

impl<F> FnListener<F>
where
    F: Fn(&QueueEvent) + Send + Sync + 'static,
{
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self {
            f,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> QueueListener for FnListener<F>
where
    F: Fn(&QueueEvent) + Send + Sync + 'static,
{
    fn handle_event(&self, event: &QueueEvent) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.f)(event);
    }
}
