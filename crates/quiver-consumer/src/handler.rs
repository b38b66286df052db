// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application-facing handler contracts.
//!
//! An application receives batches in one of two ways:
//!
//! - an exported [`QueueHandler`], called with the batch, the environment
//!   bindings, and an [`ExecutionContext`], returning when its work is done;
//! - one or more [`QueueListener`]s, called synchronously with the batch.
//!
//! An [`Entrypoint`] bundles whichever of these the application provides.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::warn;

use quiver_codec::Value;
use quiver_core::QueueError;

use crate::event::QueueEvent;
use crate::tasks::WaitUntilTasks;

/// Environment bindings passed to an exported handler.
#[derive(Debug, Clone, Default)]
pub struct Env(Arc<BTreeMap<String, Value>>);

impl Env {
    pub fn new(bindings: BTreeMap<String, Value>) -> Self {
        Self(Arc::new(bindings))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Env {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Context passed alongside a batch to an exported handler.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    tasks: WaitUntilTasks,
}

impl ExecutionContext {
    pub(crate) fn new(tasks: WaitUntilTasks) -> Self {
        Self { tasks }
    }

    /// Registers background work that may continue after the handler returns.
    pub fn wait_until<F>(&self, task: F)
    where
        F: Future<Output = Result<(), QueueError>> + Send + 'static,
    {
        self.tasks.wait_until("ctx.waitUntil()", task);
    }
}

/// An exported `queue()` handler.
#[async_trait]
pub trait QueueHandler: Send + Sync + 'static {
    async fn queue(
        &self,
        batch: QueueEvent,
        env: Env,
        ctx: ExecutionContext,
    ) -> Result<(), QueueError>;
}

/// A synchronous `queue` event listener.
pub trait QueueListener: Send + Sync + 'static {
    fn handle_event(&self, event: &QueueEvent);
}

/// An exported handler object. It may not define `queue()` at all.
#[derive(Clone, Default)]
pub struct ExportedHandler {
    pub queue: Option<Arc<dyn QueueHandler>>,
    pub env: Env,
}

impl std::fmt::Debug for ExportedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedHandler")
            .field("has_queue", &self.queue.is_some())
            .field("env", &self.env)
            .finish()
    }
}

/// What an application exposes for queue delivery.
#[derive(Default)]
pub struct Entrypoint {
    exported: Option<ExportedHandler>,
    listeners: Vec<Arc<dyn QueueListener>>,
    warned_missing_queue: AtomicBool,
    warned_missing_listener: AtomicBool,
}

/// A handler call ready to be awaited.
pub(crate) type HandlerFuture = BoxFuture<'static, Result<(), QueueError>>;

/// How a batch was handed to application code.
pub(crate) enum Dispatch {
    /// An exported handler is running.
    Handler(HandlerFuture),
    /// Listeners ran synchronously.
    Listeners,
}

impl Entrypoint {
    /// An application exporting a `queue()` handler.
    pub fn with_handler(handler: Arc<dyn QueueHandler>, env: Env) -> Self {
        Self::with_exported(ExportedHandler {
            queue: Some(handler),
            env,
        })
    }

    pub fn with_exported(exported: ExportedHandler) -> Self {
        Self {
            exported: Some(exported),
            ..Self::default()
        }
    }

    /// An application with no exported handler, relying on listeners.
    pub fn with_listeners() -> Self {
        Self::default()
    }

    pub fn add_event_listener(&mut self, listener: Arc<dyn QueueListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Hands `event` to the application.
    pub(crate) fn dispatch(
        &self,
        event: &QueueEvent,
        ctx: ExecutionContext,
    ) -> Result<Dispatch, QueueError> {
        match &self.exported {
            Some(exported) => {
                let Some(handler) = exported.queue.clone() else {
                    warn_once(
                        &self.warned_missing_queue,
                        "Received a QueueEvent but we lack a handler for QueueEvents. \
                         Did you remember to export a queue() function?",
                    );
                    return Err(QueueError::MissingHandler(
                        "Handler does not export a queue() function.".into(),
                    ));
                };
                let batch = event.clone();
                let env = exported.env.clone();
                Ok(Dispatch::Handler(Box::pin(async move {
                    handler.queue(batch, env, ctx).await
                })))
            }
            None => {
                if self.listeners.is_empty() {
                    warn_once(
                        &self.warned_missing_listener,
                        "Received a QueueEvent but we lack an event listener for queue events. \
                         Did you remember to call addEventListener(\"queue\", ...)?",
                    );
                    return Err(QueueError::MissingHandler(
                        "No event listener registered for queue messages.".into(),
                    ));
                }
                for listener in &self.listeners {
                    listener.handle_event(event);
                }
                Ok(Dispatch::Listeners)
            }
        }
    }
}

fn warn_once(flag: &AtomicBool, message: &str) {
    if !flag.swap(true, Ordering::Relaxed) {
        warn!("{message}");
    }
}
