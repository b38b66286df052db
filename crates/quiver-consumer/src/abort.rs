// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External abort signal for an invocation.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

/// Cloneable abort signal carrying the reason for the abort.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts the invocation. Only the first reason is kept.
    pub fn abort(&self, reason: impl Into<String>) {
        {
            let mut slot = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(reason.into());
            }
        }
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once aborted.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }

    /// Resolves with the abort reason once aborted.
    pub async fn reason(&self) -> String {
        self.token.cancelled().await;
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| "aborted".to_string())
    }

    /// The underlying token, for callers that cancel directly.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn first_reason_wins() {
        let signal = AbortSignal::new();
        assert!(!signal.is_aborted());
        signal.abort("memory limit");
        signal.abort("second");
        assert!(signal.is_aborted());
        assert_eq!(signal.reason().await, "memory limit");
    }

    #[tokio::test]
    async fn reason_waits_for_abort() {
        let signal = AbortSignal::new();
        let pending = tokio::time::timeout(Duration::from_millis(10), signal.reason()).await;
        assert!(pending.is_err());

        signal.token().cancel();
        assert_eq!(signal.reason().await, "aborted");
    }
}
