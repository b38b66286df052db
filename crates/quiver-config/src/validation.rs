// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::QuiverConfig;

/// Validate a deserialized configuration.
///
/// Collects every error rather than stopping at the first.
pub fn validate_config(config: &QuiverConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.limits.wall_clock_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "limits.wall_clock_timeout_secs must be greater than zero",
        ));
    }

    let base_url = config.producer.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::validation(
            "producer.base_url must not be empty",
        ));
    } else if let Err(message) = check_base_url(base_url) {
        errors.push(ConfigError::validation(message));
    }

    if config.producer.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "producer.request_timeout_secs must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The base URL must parse and use an http(s) scheme.
fn check_base_url(base_url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| format!("producer.base_url `{base_url}` is not a valid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "producer.base_url `{base_url}` must be an http:// or https:// URL, not {other}://"
        )),
    }
}
