// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock limit enforcement.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use quiver_config::LimitsConfig;
use quiver_core::{EventOutcome, LimitEnforcer};

/// Enforces a wall-clock ceiling measured from construction.
///
/// Hosts that track other resources (CPU, memory) report an exceeded limit
/// through [`WallClockLimits::record_exceeded`]; it then overrides whatever
/// outcome the invocation computed.
#[derive(Debug)]
pub struct WallClockLimits {
    deadline: Instant,
    exceeded: Mutex<Option<EventOutcome>>,
}

impl WallClockLimits {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            exceeded: Mutex::new(None),
        }
    }

    pub fn from_config(config: &LimitsConfig) -> Self {
        Self::new(config.wall_clock_timeout())
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Records an exceeded limit. The first one recorded is kept.
    pub fn record_exceeded(&self, outcome: EventOutcome) {
        let mut slot = self.exceeded.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(outcome);
    }
}

#[async_trait]
impl LimitEnforcer for WallClockLimits {
    async fn limit_scheduled(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }

    fn limits_exceeded(&self) -> Option<EventOutcome> {
        *self.exceeded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
