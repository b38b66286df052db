// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery of one batch to application code.
//!
//! [`QueueCustomEvent::run`] builds the batch event, hands it to the
//! entrypoint, and waits for the work to finish under one of two policies:
//!
//! - **Handler-scoped** (`queue_consumer_no_wait_for_wait_until`): the result
//!   is whichever comes first of the handler finishing, the scheduled limit,
//!   or an abort. Background tasks keep running after the result is returned.
//! - **Wait for all** (default): the handler call joins the background tasks
//!   and the result waits for all of them, bounded by the scheduled limit.
//!
//! [`QueueCustomEvent::send_rpc`](crate::rpc) forwards the batch to a remote
//! dispatcher instead.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info_span, warn};

use quiver_config::{CompatConfig, QuiverConfig};
use quiver_core::{
    CustomEventResult, EventOutcome, LimitEnforcer, QueueError, QueueRequest, QueueRetryMessage,
    RetryBatch,
};

use crate::abort::AbortSignal;
use crate::event::{CompletionStatus, QueueEvent};
use crate::handler::{Dispatch, Entrypoint, ExecutionContext};
use crate::limits::WallClockLimits;
use crate::message::IncomingQueueMessage;
use crate::outcome::{BatchOutcome, SharedOutcome};
use crate::tasks::WaitUntilTasks;

const ABORT_REASON_UNAVAILABLE: &str = "onAbort() promise has unexpectedly not yet been rejected";

/// A batch delivered by the local host.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalQueueParams {
    pub queue_name: String,
    pub messages: Vec<IncomingQueueMessage>,
}

/// Where a batch came from.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueParams {
    Rpc(QueueRequest),
    Local(LocalQueueParams),
}

impl QueueParams {
    pub fn queue_name(&self) -> &str {
        match self {
            Self::Rpc(request) => &request.queue_name,
            Self::Local(params) => &params.queue_name,
        }
    }

    pub fn batch_size(&self) -> usize {
        match self {
            Self::Rpc(request) => request.messages.len(),
            Self::Local(params) => params.messages.len(),
        }
    }

    /// Encodes the batch for a dispatcher call.
    pub fn to_request(&self) -> Result<QueueRequest, QueueError> {
        match self {
            Self::Rpc(request) => Ok(request.clone()),
            Self::Local(params) => Ok(QueueRequest {
                queue_name: params.queue_name.clone(),
                messages: params
                    .messages
                    .iter()
                    .map(IncomingQueueMessage::to_rpc)
                    .collect::<Result<_, _>>()?,
            }),
        }
    }

    fn build_event(
        &self,
        outcome: SharedOutcome,
        tasks: WaitUntilTasks,
    ) -> Result<QueueEvent, QueueError> {
        match self {
            Self::Rpc(request) => QueueEvent::from_request(request, outcome, tasks),
            Self::Local(params) => {
                QueueEvent::from_local(&params.queue_name, &params.messages, outcome, tasks)
            }
        }
    }
}

/// Collaborators for one invocation.
#[derive(Clone)]
pub struct InvocationContext {
    pub tasks: WaitUntilTasks,
    pub limits: Arc<dyn LimitEnforcer>,
    pub abort: AbortSignal,
    pub compat: CompatConfig,
    pub abort_reason_timeout: Duration,
}

impl InvocationContext {
    /// Fresh collaborators with a wall-clock limit starting now.
    pub fn new(config: &QuiverConfig) -> Self {
        Self {
            tasks: WaitUntilTasks::new(),
            limits: Arc::new(WallClockLimits::from_config(&config.limits)),
            abort: AbortSignal::new(),
            compat: config.compat,
            abort_reason_timeout: config.limits.abort_reason_timeout(),
        }
    }

    pub fn with_limits(mut self, limits: Arc<dyn LimitEnforcer>) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinishScheduledResult {
    Completed,
    Timeout,
    Aborted,
}

/// Waits for every background task, bounded by the limit and the abort signal.
async fn finish_scheduled(
    tasks: &WaitUntilTasks,
    limits: &dyn LimitEnforcer,
    abort: &AbortSignal,
) -> FinishScheduledResult {
    tokio::select! {
        _ = tasks.drain() => FinishScheduledResult::Completed,
        _ = limits.limit_scheduled() => FinishScheduledResult::Timeout,
        _ = abort.aborted() => FinishScheduledResult::Aborted,
    }
}

/// One batch delivery and the decisions made for it.
#[derive(Debug)]
pub struct QueueCustomEvent {
    pub(crate) params: QueueParams,
    pub(crate) result: SharedOutcome,
}

impl QueueCustomEvent {
    pub fn new(params: QueueParams) -> Self {
        Self {
            params,
            result: SharedOutcome::new(),
        }
    }

    pub fn params(&self) -> &QueueParams {
        &self.params
    }

    /// Delivers the batch to `entrypoint` and returns the invocation outcome.
    ///
    /// Work left running past the result is tracked on `background`.
    pub async fn run(
        &self,
        entrypoint: &Entrypoint,
        ctx: InvocationContext,
        background: &TaskTracker,
    ) -> CustomEventResult {
        let span = info_span!(
            "queue_event",
            queue_name = self.params.queue_name(),
            batch_size = self.params.batch_size()
        );

        let outcome = if ctx.compat.queue_consumer_no_wait_for_wait_until {
            self.run_handler_scoped(entrypoint, &ctx, background)
                .instrument(span.clone())
                .await
        } else {
            self.run_wait_for_all(entrypoint, &ctx)
                .instrument(span.clone())
                .await
        };

        let outcome = match ctx.limits.limits_exceeded() {
            Some(exceeded) => exceeded,
            None => outcome,
        };
        span.in_scope(|| debug!(%outcome, "queue event finished"));
        CustomEventResult::from(outcome)
    }

    /// Builds the event and hands it over. Completion status is recorded on
    /// the event when the handler settles.
    fn start(
        &self,
        entrypoint: &Entrypoint,
        tasks: &WaitUntilTasks,
    ) -> Result<(QueueEvent, Dispatch), QueueError> {
        let event = self.params.build_event(self.result.clone(), tasks.clone())?;
        let dispatch = entrypoint.dispatch(&event, ExecutionContext::new(tasks.clone()))?;

        let dispatch = match dispatch {
            Dispatch::Handler(call) => {
                let tracked = event.clone();
                Dispatch::Handler(Box::pin(async move {
                    let result = call.await;
                    tracked.set_completion_status(match &result {
                        Ok(()) => CompletionStatus::CompletedSuccessfully,
                        Err(e) => CompletionStatus::CompletedWithError(e.to_string()),
                    });
                    result
                }))
            }
            Dispatch::Listeners => {
                event.set_completion_status(CompletionStatus::CompletedSuccessfully);
                Dispatch::Listeners
            }
        };
        Ok((event, dispatch))
    }

    async fn run_handler_scoped(
        &self,
        entrypoint: &Entrypoint,
        ctx: &InvocationContext,
        background: &TaskTracker,
    ) -> EventOutcome {
        let (handler, is_listener) = match self.start(entrypoint, &ctx.tasks) {
            Ok((_, Dispatch::Handler(call))) => {
                (Some(tokio::spawn(call.in_current_span())), false)
            }
            Ok((_, Dispatch::Listeners)) => (None, true),
            Err(e) => {
                warn!(error = %e, "queue event failed to start");
                return EventOutcome::Exception;
            }
        };

        // A handler that loses the race keeps running detached.
        let settled = async move {
            match handler {
                Some(handle) => match handle.await {
                    Ok(Ok(())) => EventOutcome::Ok,
                    Ok(Err(e)) => {
                        warn!(error = %e, "queue handler failed");
                        EventOutcome::Exception
                    }
                    Err(e) => {
                        warn!(error = %e, "queue handler panicked");
                        EventOutcome::Exception
                    }
                },
                None => EventOutcome::Ok,
            }
        };

        let outcome = tokio::select! {
            outcome = settled => outcome,
            _ = ctx.limits.limit_scheduled() => EventOutcome::ExceededCpu,
            _ = ctx.abort.aborted() => EventOutcome::Exception,
        };

        if outcome == EventOutcome::Ok && is_listener {
            // Listeners have no completion of their own; background tasks are
            // the only way they do async work.
            let finished = finish_scheduled(&ctx.tasks, &*ctx.limits, &ctx.abort).await;
            return if finished == FinishScheduledResult::Completed {
                ctx.tasks.status()
            } else {
                EventOutcome::ExceededCpu
            };
        }

        let tasks = ctx.tasks.clone();
        let limits = Arc::clone(&ctx.limits);
        let abort = ctx.abort.clone();
        background.spawn(
            async move {
                let finished = finish_scheduled(&tasks, &*limits, &abort).await;
                if finished != FinishScheduledResult::Completed {
                    debug!(
                        pending_tasks = ?tasks.pending_labels(),
                        "background tasks abandoned after queue event"
                    );
                }
            }
            .in_current_span(),
        );
        outcome
    }

    async fn run_wait_for_all(
        &self,
        entrypoint: &Entrypoint,
        ctx: &InvocationContext,
    ) -> EventOutcome {
        let event = match self.start(entrypoint, &ctx.tasks) {
            Ok((event, dispatch)) => {
                if let Dispatch::Handler(call) = dispatch {
                    ctx.tasks.wait_until("queue() handler", call);
                }
                Some(event)
            }
            Err(e) => {
                ctx.tasks.wait_until("queue event start", async move { Err(e) });
                None
            }
        };

        let finished = finish_scheduled(&ctx.tasks, &*ctx.limits, &ctx.abort).await;
        if finished == FinishScheduledResult::Completed {
            return ctx.tasks.status();
        }

        let completion_status = event
            .as_ref()
            .map(|e| e.completion_status().to_string())
            .unwrap_or_else(|| "Empty".to_string());
        let pending_tasks = ctx.tasks.pending_labels();
        let queue_name = self.params.queue_name();
        let batch_size = self.params.batch_size();

        if finished == FinishScheduledResult::Timeout {
            warn!(
                queue_name,
                batch_size,
                %completion_status,
                ?pending_tasks,
                "queue event hit timeout"
            );
        } else {
            let abort_reason =
                tokio::time::timeout(ctx.abort_reason_timeout, ctx.abort.reason())
                    .await
                    .unwrap_or_else(|_| ABORT_REASON_UNAVAILABLE.to_string());
            warn!(
                queue_name,
                batch_size,
                %completion_status,
                ?pending_tasks,
                %abort_reason,
                "queue event aborted"
            );
        }
        EventOutcome::ExceededCpu
    }

    /// Copy of the decisions recorded so far.
    pub fn outcome(&self) -> BatchOutcome {
        self.result.snapshot()
    }

    pub fn ack_all(&self) -> bool {
        self.result.lock().ack_all
    }

    pub fn retry_batch(&self) -> RetryBatch {
        self.result.lock().retry_batch
    }

    pub fn explicit_acks(&self) -> Vec<String> {
        self.result.lock().explicit_acks()
    }

    pub fn retry_messages(&self) -> Vec<QueueRetryMessage> {
        self.result.lock().retry_messages()
    }
}
