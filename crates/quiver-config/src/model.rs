// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Quiver queue delivery engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key is
//! reported at startup instead of being silently ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Quiver configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuiverConfig {
    /// Compatibility switches that change wire or completion behavior.
    #[serde(default)]
    pub compat: CompatConfig,

    /// Time limits applied to queue event handling.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Outbound queue binding.
    #[serde(default)]
    pub producer: ProducerConfig,
}

/// Compatibility switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompatConfig {
    /// Serialize messages without an explicit content type as JSON instead of v8.
    #[serde(default)]
    pub queues_json_messages: bool,

    /// Return from a queue event as soon as the handler settles, draining
    /// background tasks afterwards.
    #[serde(default)]
    pub queue_consumer_no_wait_for_wait_until: bool,
}

/// Time limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Wall-clock ceiling for scheduled work, in seconds.
    #[serde(default = "default_wall_clock_timeout_secs")]
    pub wall_clock_timeout_secs: u64,

    /// How long to wait for an abort reason before giving up, in microseconds.
    #[serde(default = "default_abort_reason_timeout_micros")]
    pub abort_reason_timeout_micros: u64,
}

impl LimitsConfig {
    pub fn wall_clock_timeout(&self) -> Duration {
        Duration::from_secs(self.wall_clock_timeout_secs)
    }

    pub fn abort_reason_timeout(&self) -> Duration {
        Duration::from_micros(self.abort_reason_timeout_micros)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            wall_clock_timeout_secs: default_wall_clock_timeout_secs(),
            abort_reason_timeout_micros: default_abort_reason_timeout_micros(),
        }
    }
}

fn default_wall_clock_timeout_secs() -> u64 {
    900
}

fn default_abort_reason_timeout_micros() -> u64 {
    1
}

/// Outbound queue binding.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProducerConfig {
    /// Base URL of the broker channel bound to this queue.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ProducerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://queue-broker.invalid/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}
