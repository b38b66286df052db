// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Quiver configuration system.

use std::io::Write;

use quiver_config::diagnostic::ConfigError;
use quiver_config::model::QuiverConfig;
use quiver_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// Every known section and key deserializes.
#[test]
fn valid_toml_deserializes_into_quiver_config() {
    let toml = r#"
[compat]
queues_json_messages = true
queue_consumer_no_wait_for_wait_until = true

[limits]
wall_clock_timeout_secs = 30
abort_reason_timeout_micros = 250

[producer]
base_url = "http://127.0.0.1:9000/queues/orders"
request_timeout_secs = 5
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert!(config.compat.queues_json_messages);
    assert!(config.compat.queue_consumer_no_wait_for_wait_until);
    assert_eq!(config.limits.wall_clock_timeout_secs, 30);
    assert_eq!(config.limits.abort_reason_timeout_micros, 250);
    assert_eq!(config.producer.base_url, "http://127.0.0.1:9000/queues/orders");
    assert_eq!(config.producer.request_timeout_secs, 5);
}

/// Missing sections fall back to defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert!(!config.compat.queues_json_messages);
    assert!(!config.compat.queue_consumer_no_wait_for_wait_until);
    assert_eq!(config.limits.wall_clock_timeout_secs, 900);
    assert_eq!(config.limits.abort_reason_timeout_micros, 1);
    assert_eq!(config.producer.base_url, "https://queue-broker.invalid/");
}

/// A mistyped key inside a section is rejected.
#[test]
fn unknown_field_in_compat_produces_error() {
    let toml = r#"
[compat]
queues_json_message = true
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("queues_json_message"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// An unexpected top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[metrics]
enabled = true
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Diagnostics carry a suggestion and a source span for inline TOML.
#[test]
fn unknown_key_diagnostic_suggests_correction() {
    let toml = "[limits]\nwall_clock_timout_secs = 10\n";

    let errors = load_and_validate_str(toml).expect_err("should fail");
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "wall_clock_timout_secs");
            assert_eq!(suggestion.as_deref(), Some("wall_clock_timeout_secs"));
            assert!(span.is_some());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// A value of the wrong type names the offending key.
#[test]
fn invalid_type_names_the_key() {
    let toml = "[limits]\nwall_clock_timeout_secs = \"soon\"\n";

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidType { key, .. } if key.contains("wall_clock_timeout_secs")
        )),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn load_and_validate_str_rejects_bad_values() {
    let toml = r#"
[limits]
wall_clock_timeout_secs = 0

[producer]
base_url = "broker.local"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, ConfigError::Validation { .. })));
}

/// Dotted keys, as produced by the env provider, override file values.
#[test]
fn dotted_override_sets_underscored_key() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: QuiverConfig = Figment::new()
        .merge(Serialized::defaults(QuiverConfig::default()))
        .merge(Toml::string("[limits]\nwall_clock_timeout_secs = 60\n"))
        .merge(("limits.wall_clock_timeout_secs", 5))
        .merge(("compat.queue_consumer_no_wait_for_wait_until", true))
        .extract()
        .expect("should merge overrides");

    assert_eq!(config.limits.wall_clock_timeout_secs, 5);
    assert!(config.compat.queue_consumer_no_wait_for_wait_until);
}

/// `QUIVER_<SECTION>_<KEY>` environment variables land in their section.
#[test]
fn quiver_env_vars_map_to_sections() {
    use figment::{providers::Serialized, Figment, Jail};
    use quiver_config::loader::env_provider;

    Jail::expect_with(|jail| {
        jail.set_env("QUIVER_LIMITS_WALL_CLOCK_TIMEOUT_SECS", "5");
        jail.set_env("QUIVER_COMPAT_QUEUE_CONSUMER_NO_WAIT_FOR_WAIT_UNTIL", "true");

        let config: QuiverConfig = Figment::new()
            .merge(Serialized::defaults(QuiverConfig::default()))
            .merge(env_provider())
            .extract()?;

        assert_eq!(config.limits.wall_clock_timeout_secs, 5);
        assert!(config.compat.queue_consumer_no_wait_for_wait_until);
        assert!(!config.compat.queues_json_messages);
        Ok(())
    });
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_file_silently_skipped() {
    let config = load_config_from_path(std::path::Path::new("/nonexistent/quiver.toml"))
        .expect("missing file should be skipped");
    assert_eq!(config.producer.request_timeout_secs, 30);
}

/// A config file on disk is loaded.
#[test]
fn config_file_is_loaded_from_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[producer]\nrequest_timeout_secs = 12").expect("write");

    let config = load_config_from_path(file.path()).expect("should load");
    assert_eq!(config.producer.request_timeout_secs, 12);
}
