// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource limit enforcer trait.

use async_trait::async_trait;

use crate::types::EventOutcome;

/// Supplies timeout signals and post-hoc limit checks for one invocation.
#[async_trait]
pub trait LimitEnforcer: Send + Sync + 'static {
    /// Resolves once the scheduled-work ceiling has been reached.
    ///
    /// Never resolves if the invocation has no ceiling.
    async fn limit_scheduled(&self);

    /// Returns an outcome if a limit was already exceeded.
    fn limits_exceeded(&self) -> Option<EventOutcome>;
}
