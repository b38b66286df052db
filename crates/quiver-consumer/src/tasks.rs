// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background tasks registered during a queue invocation.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{Instrument, warn};

use quiver_core::{EventOutcome, QueueError};

/// Set of background tasks that may outlive the handler call.
///
/// Tasks run on the tokio runtime as soon as they are registered. [`drain`]
/// waits for the set to become empty and [`status`] reports whether any task
/// failed.
///
/// [`drain`]: WaitUntilTasks::drain
/// [`status`]: WaitUntilTasks::status
#[derive(Debug, Clone, Default)]
pub struct WaitUntilTasks {
    inner: Arc<TasksInner>,
}

#[derive(Debug, Default)]
struct TasksInner {
    pending: Mutex<BTreeMap<u64, String>>,
    next_id: AtomicU64,
    failed: AtomicBool,
    idle: Notify,
}

impl TasksInner {
    fn pending(&self) -> MutexGuard<'_, BTreeMap<u64, String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a task from the pending set however it ends, panics included.
struct PendingGuard {
    inner: Arc<TasksInner>,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner.failed.store(true, Ordering::SeqCst);
        }
        self.inner.pending().remove(&self.id);
        self.inner.idle.notify_waiters();
    }
}

impl WaitUntilTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` and tracks it under `label` until it finishes.
    pub fn wait_until<F>(&self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), QueueError>> + Send + 'static,
    {
        let label = label.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.pending().insert(id, label.clone());

        let guard = PendingGuard {
            inner: Arc::clone(&self.inner),
            id,
        };
        tokio::spawn(
            async move {
                let guard = guard;
                if let Err(e) = task.await {
                    warn!(task = %label, error = %e, "background task failed");
                    guard.inner.failed.store(true, Ordering::SeqCst);
                }
            }
            .in_current_span(),
        );
    }

    /// Resolves once no task is pending.
    pub async fn drain(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a completion in between is not missed.
            notified.as_mut().enable();
            if self.inner.pending().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Labels of tasks still running, oldest first.
    pub fn pending_labels(&self) -> Vec<String> {
        self.inner.pending().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Exception` if any task failed, `Ok` otherwise.
    pub fn status(&self) -> EventOutcome {
        if self.inner.failed.load(Ordering::SeqCst) {
            EventOutcome::Exception
        } else {
            EventOutcome::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn drain_on_empty_set_returns_immediately() {
        let tasks = WaitUntilTasks::new();
        tasks.drain().await;
        assert_eq!(tasks.status(), EventOutcome::Ok);
    }

    #[tokio::test]
    async fn drain_waits_for_every_task() {
        let tasks = WaitUntilTasks::new();
        let (tx, rx) = oneshot::channel::<()>();
        tasks.wait_until("first", async move {
            let _ = rx.await;
            Ok(())
        });
        tasks.wait_until("second", async { Ok(()) });

        tokio::task::yield_now().await;
        assert_eq!(tasks.pending_labels(), vec!["first".to_string()]);

        let drained = tokio::spawn({
            let tasks = tasks.clone();
            async move { tasks.drain().await }
        });
        tokio::task::yield_now().await;
        assert!(!drained.is_finished());

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), drained)
            .await
            .unwrap()
            .unwrap();
        assert!(tasks.is_empty());
        assert_eq!(tasks.status(), EventOutcome::Ok);
    }

    #[tokio::test]
    async fn failed_task_sets_exception_status() {
        let tasks = WaitUntilTasks::new();
        tasks.wait_until("boom", async { Err(QueueError::Handler("boom".into())) });
        tasks.drain().await;
        assert_eq!(tasks.status(), EventOutcome::Exception);
    }

    #[tokio::test]
    async fn panicking_task_is_removed_and_marked_failed() {
        let tasks = WaitUntilTasks::new();
        let explode = true;
        tasks.wait_until("panics", async move {
            if explode {
                panic!("task panicked");
            }
            Ok(())
        });
        tokio::time::timeout(Duration::from_secs(5), tasks.drain())
            .await
            .unwrap();
        assert_eq!(tasks.status(), EventOutcome::Exception);
    }
}
