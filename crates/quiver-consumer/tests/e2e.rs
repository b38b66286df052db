// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end delivery tests for the consumer side.
//!
//! Each test builds a batch, an entrypoint, and its own collaborators, then
//! drives one delivery through `QueueCustomEvent`. Limits are triggered
//! manually unless a test exercises the wall-clock limit under paused time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing_test::traced_test;

use quiver_codec::Value;
use quiver_config::QuiverConfig;
use quiver_consumer::{
    AbortSignal, Entrypoint, Env, ExecutionContext, ExportedHandler, InvocationContext,
    LocalDispatcher, QueueCustomEvent, QueueEvent, QueueRetryOptions,
};
use quiver_core::{EventOutcome, QueueError, QueueResponse, QueueRetryMessage, RetryBatch};
use quiver_test_utils::{
    BatchBuilder, FnHandler, FnListener, ManualLimits, MockDispatcher, NeverSettles,
};

fn config(handler_scoped: bool) -> QuiverConfig {
    let mut config = QuiverConfig::default();
    config.compat.queue_consumer_no_wait_for_wait_until = handler_scoped;
    config
}

fn invocation(config: &QuiverConfig, limits: &ManualLimits) -> InvocationContext {
    InvocationContext::new(config).with_limits(Arc::new(limits.clone()))
}

// ---- Ack and retry decisions ----

#[tokio::test]
async fn test_ack_retry_and_undecided_messages() {
    let handler = FnHandler::new(|batch: QueueEvent, _ctx: ExecutionContext| async move {
        batch.messages()[0].ack();
        batch.messages()[1].retry(QueueRetryOptions::delay(5));
        Ok(())
    });
    let entrypoint = Entrypoint::with_handler(handler.clone(), Env::default());
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(3).build_local());

    let result = event
        .run(
            &entrypoint,
            invocation(&config(false), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Ok);
    assert_eq!(handler.calls(), 1);
    assert_eq!(event.explicit_acks(), vec!["m1".to_string()]);
    assert_eq!(
        event.retry_messages(),
        vec![QueueRetryMessage {
            msg_id: "m2".into(),
            delay_seconds: Some(5),
        }]
    );
    assert!(!event.ack_all());
    assert_eq!(event.retry_batch(), RetryBatch::default());
}

#[tokio::test]
#[traced_test]
async fn test_retry_all_then_ack_is_ignored_with_warning() {
    let handler = FnHandler::new(|batch: QueueEvent, _ctx: ExecutionContext| async move {
        batch.retry_all(QueueRetryOptions::default());
        batch.messages()[0].ack();
        Ok(())
    });
    let entrypoint = Entrypoint::with_handler(handler, Env::default());
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(2).build_local());

    let result = event
        .run(
            &entrypoint,
            invocation(&config(false), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Ok);
    assert!(event.retry_batch().retry);
    assert!(event.explicit_acks().is_empty());
    assert!(logs_contain(
        "Received a call to ack() on message m1 after retryAll() was already called."
    ));
}

#[tokio::test]
async fn test_json_bodies_are_decoded_for_the_handler() {
    let seen = Arc::new(std::sync::Mutex::new(None));
    let sink = Arc::clone(&seen);
    let handler = FnHandler::new(move |batch: QueueEvent, _ctx: ExecutionContext| {
        let sink = Arc::clone(&sink);
        async move {
            let message = &batch.messages()[0];
            *sink.lock().unwrap() = Some((message.body().clone(), message.attempts()));
            Ok(())
        }
    });
    let entrypoint = Entrypoint::with_handler(handler, Env::default());
    let event = QueueCustomEvent::new(
        BatchBuilder::new("orders")
            .json("j1", serde_json::json!({"sku": "A-1", "qty": 2}))
            .attempts(4)
            .build_rpc()
            .unwrap(),
    );

    let result = event
        .run(
            &entrypoint,
            invocation(&config(false), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Ok);
    let (body, attempts) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body.get("sku"), Some(&Value::from("A-1")));
    assert_eq!(body.get("qty").and_then(Value::as_f64), Some(2.0));
    assert_eq!(attempts, 4);
}

// ---- Handler-scoped completion ----

#[tokio::test]
async fn test_handler_scoped_returns_before_background_work() {
    let handler = FnHandler::new(|_batch: QueueEvent, ctx: ExecutionContext| async move {
        ctx.wait_until(std::future::pending());
        Ok(())
    });
    let entrypoint = Entrypoint::with_handler(handler, Env::default());
    let limits = ManualLimits::new();
    let background = TaskTracker::new();
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let result = event
        .run(&entrypoint, invocation(&config(true), &limits), &background)
        .await;

    assert_eq!(result.outcome, EventOutcome::Ok);
    assert_eq!(background.len(), 1);

    // The detached drain gives up once the scheduled limit fires.
    limits.trigger();
    background.close();
    tokio::time::timeout(Duration::from_secs(5), background.wait())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_handler_scoped_never_settling_handler_exceeds_cpu() {
    let entrypoint = Entrypoint::with_handler(Arc::new(NeverSettles), Env::default());
    let limits = ManualLimits::new();
    limits.trigger();
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let result = event
        .run(&entrypoint, invocation(&config(true), &limits), &TaskTracker::new())
        .await;

    assert_eq!(result.outcome, EventOutcome::ExceededCpu);
}

#[tokio::test]
async fn test_handler_scoped_abort_is_an_exception() {
    let entrypoint = Entrypoint::with_handler(Arc::new(NeverSettles), Env::default());
    let abort = AbortSignal::new();
    abort.abort("client went away");
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let ctx = invocation(&config(true), &ManualLimits::new()).with_abort(abort);
    let result = event.run(&entrypoint, ctx, &TaskTracker::new()).await;

    assert_eq!(result.outcome, EventOutcome::Exception);
}

#[tokio::test]
async fn test_handler_scoped_handler_error_is_an_exception() {
    let handler = FnHandler::new(|_batch: QueueEvent, _ctx: ExecutionContext| async move {
        Err(QueueError::Handler("database unavailable".into()))
    });
    let entrypoint = Entrypoint::with_handler(handler, Env::default());
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let result = event
        .run(
            &entrypoint,
            invocation(&config(true), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Exception);
}

#[tokio::test(start_paused = true)]
async fn test_handler_scoped_listeners_wait_for_background_tasks() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let listener = FnListener::new(move |event: &QueueEvent| {
        event.ack_all();
        let flag = Arc::clone(&flag);
        event.wait_until(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
    });
    let mut entrypoint = Entrypoint::with_listeners();
    entrypoint.add_event_listener(listener.clone());
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(2).build_local());

    let result = event
        .run(
            &entrypoint,
            invocation(&config(true), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Ok);
    assert_eq!(listener.calls(), 1);
    assert!(finished.load(Ordering::SeqCst));
    assert!(event.ack_all());
}

// ---- Wait-for-all completion ----

#[tokio::test(start_paused = true)]
async fn test_wait_for_all_waits_for_background_tasks() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let handler = FnHandler::new(move |_batch: QueueEvent, ctx: ExecutionContext| {
        let flag = Arc::clone(&flag);
        async move {
            ctx.wait_until(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            });
            Ok(())
        }
    });
    let entrypoint = Entrypoint::with_handler(handler, Env::default());
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let result = event
        .run(
            &entrypoint,
            invocation(&config(false), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Ok);
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_wait_for_all_failed_background_task_is_an_exception() {
    let handler = FnHandler::new(|_batch: QueueEvent, ctx: ExecutionContext| async move {
        ctx.wait_until(async { Err(QueueError::Handler("upload failed".into())) });
        Ok(())
    });
    let entrypoint = Entrypoint::with_handler(handler, Env::default());
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let result = event
        .run(
            &entrypoint,
            invocation(&config(false), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Exception);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_wait_for_all_timeout_logs_diagnostics() {
    let mut config = config(false);
    config.limits.wall_clock_timeout_secs = 10;
    let entrypoint = Entrypoint::with_handler(Arc::new(NeverSettles), Env::default());
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(2).build_local());

    let result = event
        .run(
            &entrypoint,
            InvocationContext::new(&config),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::ExceededCpu);
    assert!(logs_contain("queue event hit timeout"));
    assert!(logs_contain("queue() handler"));
    assert!(logs_contain("completion_status=Incomplete"));
    assert!(logs_contain("batch_size=2"));
}

#[tokio::test]
#[traced_test]
async fn test_wait_for_all_abort_logs_reason() {
    let entrypoint = Entrypoint::with_handler(Arc::new(NeverSettles), Env::default());
    let abort = AbortSignal::new();
    abort.abort("client disconnected");
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let ctx = invocation(&config(false), &ManualLimits::new()).with_abort(abort);
    let result = event.run(&entrypoint, ctx, &TaskTracker::new()).await;

    assert_eq!(result.outcome, EventOutcome::ExceededCpu);
    assert!(logs_contain("queue event aborted"));
    assert!(logs_contain("client disconnected"));
}

// ---- Missing handlers ----

#[tokio::test]
async fn test_missing_queue_function_is_an_exception_under_both_policies() {
    let entrypoint = Entrypoint::with_exported(ExportedHandler::default());

    for handler_scoped in [false, true] {
        let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());
        let result = event
            .run(
                &entrypoint,
                invocation(&config(handler_scoped), &ManualLimits::new()),
                &TaskTracker::new(),
            )
            .await;
        assert_eq!(result.outcome, EventOutcome::Exception);
    }
}

#[tokio::test]
#[traced_test]
async fn test_no_listener_registered_warns() {
    let entrypoint = Entrypoint::with_listeners();
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let result = event
        .run(
            &entrypoint,
            invocation(&config(false), &ManualLimits::new()),
            &TaskTracker::new(),
        )
        .await;

    assert_eq!(result.outcome, EventOutcome::Exception);
    assert!(logs_contain("addEventListener"));
}

// ---- Post-hoc limit override ----

#[tokio::test]
async fn test_exceeded_limit_overrides_outcome() {
    let handler = FnHandler::new(|batch: QueueEvent, _ctx: ExecutionContext| async move {
        batch.ack_all();
        Ok(())
    });
    let entrypoint = Entrypoint::with_handler(handler, Env::default());

    for handler_scoped in [false, true] {
        let limits = ManualLimits::new();
        limits.set_exceeded(EventOutcome::ExceededMemory);
        let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());
        let result = event
            .run(
                &entrypoint,
                invocation(&config(handler_scoped), &limits),
                &TaskTracker::new(),
            )
            .await;
        assert_eq!(result.outcome, EventOutcome::ExceededMemory);
        assert!(event.ack_all());
    }
}

// ---- RPC bridge ----

#[tokio::test]
async fn test_rpc_response_replaces_decisions() {
    let dispatcher = MockDispatcher::with_responses(vec![QueueResponse {
        outcome: EventOutcome::Ok,
        ack_all: true,
        retry_batch: RetryBatch::default(),
        explicit_acks: vec!["m2".into()],
        retry_messages: Vec::new(),
    }]);
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(2).build_rpc().unwrap());

    let result = event.send_rpc(&dispatcher).await.unwrap();

    assert_eq!(result.outcome, EventOutcome::Ok);
    assert!(event.ack_all());
    assert_eq!(event.explicit_acks(), vec!["m2".to_string()]);
    let requests = dispatcher.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[0].messages[0].content_type, "text");
}

#[tokio::test]
async fn test_rpc_failure_propagates() {
    let dispatcher = MockDispatcher::new();
    dispatcher.push_failure("dispatcher unavailable").await;
    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(1).build_local());

    let err = event.send_rpc(&dispatcher).await.unwrap_err();
    assert!(err.to_string().contains("dispatcher unavailable"));
}

#[tokio::test]
async fn test_rpc_through_local_dispatcher() {
    let handler = FnHandler::new(|batch: QueueEvent, _ctx: ExecutionContext| async move {
        batch.retry_all(QueueRetryOptions::delay(60));
        batch.messages()[2].retry(QueueRetryOptions::delay(5));
        Ok(())
    });
    let entrypoint = Arc::new(Entrypoint::with_handler(handler, Env::default()));
    let dispatcher = LocalDispatcher::new(entrypoint, QuiverConfig::default());

    let event = QueueCustomEvent::new(BatchBuilder::new("orders").texts(3).build_local());
    let result = event.send_rpc(&dispatcher).await.unwrap();

    assert_eq!(result.outcome, EventOutcome::Ok);
    assert_eq!(
        event.retry_batch(),
        RetryBatch {
            retry: true,
            delay_seconds: Some(60),
        }
    );
    assert_eq!(event.retry_messages()[0].msg_id, "m3");
    assert!(event.explicit_acks().is_empty());
}
