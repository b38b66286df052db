// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Limit enforcer driven by the test instead of a clock.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use quiver_core::{EventOutcome, LimitEnforcer};

/// A [`LimitEnforcer`] whose scheduled limit fires only on [`ManualLimits::trigger`].
#[derive(Debug, Clone, Default)]
pub struct ManualLimits {
    scheduled: CancellationToken,
    exceeded: Arc<Mutex<Option<EventOutcome>>>,
}

impl ManualLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the scheduled limit.
    pub fn trigger(&self) {
        self.scheduled.cancel();
    }

    /// Reports `outcome` from `limits_exceeded`.
    pub fn set_exceeded(&self, outcome: EventOutcome) {
        *self.exceeded.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
    }
}

#[async_trait]
impl LimitEnforcer for ManualLimits {
    async fn limit_scheduled(&self) {
        self.scheduled.cancelled().await;
    }

    fn limits_exceeded(&self) -> Option<EventOutcome> {
        *self.exceeded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
