// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the producer, codec, and consumer crates.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::QueueError;

/// Wire-format tag selecting which codec handles a message body.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Bytes,
    /// UTF-8 JSON text.
    Json,
    /// Engine-native structured serialization.
    #[default]
    V8,
}

impl ContentType {
    /// Validates a user-supplied content type, ignoring ASCII case.
    pub fn validate(content_type: &str) -> Result<Self, QueueError> {
        Self::from_str(content_type).map_err(|_| {
            QueueError::type_error(format!(
                "Unsupported queue message content type: {content_type}"
            ))
        })
    }

    /// Parses the content type carried on an incoming wire message.
    ///
    /// Missing or empty metadata means [`ContentType::V8`].
    pub fn from_wire(content_type: Option<&str>) -> Result<Self, QueueError> {
        match content_type {
            None | Some("") => Ok(Self::V8),
            Some(other) => Self::validate(other),
        }
    }

    /// Canonical lower-case tag.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Terminal result code of a custom-event invocation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventOutcome {
    Unknown,
    Ok,
    Exception,
    ExceededCpu,
    ExceededMemory,
    ExceededWallTime,
    Canceled,
    KillSwitch,
    LoadShed,
}

/// Result returned for one delivered batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEventResult {
    pub outcome: EventOutcome,
}

impl From<EventOutcome> for CustomEventResult {
    fn from(outcome: EventOutcome) -> Self {
        Self { outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_validation_is_case_insensitive() {
        assert_eq!(ContentType::validate("TEXT").unwrap(), ContentType::Text);
        assert_eq!(ContentType::validate("Json").unwrap(), ContentType::Json);
        assert_eq!(ContentType::validate("v8").unwrap(), ContentType::V8);
        assert_eq!(ContentType::validate("bYtEs").unwrap(), ContentType::Bytes);
    }

    #[test]
    fn unknown_content_type_names_the_input() {
        let err = ContentType::validate("Protobuf").unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(
            err.to_string(),
            "TypeError: Unsupported queue message content type: Protobuf"
        );
    }

    #[test]
    fn missing_wire_content_type_defaults_to_v8() {
        assert_eq!(ContentType::from_wire(None).unwrap(), ContentType::V8);
        assert_eq!(ContentType::from_wire(Some("")).unwrap(), ContentType::V8);
        assert_eq!(ContentType::from_wire(Some("text")).unwrap(), ContentType::Text);
        assert!(ContentType::from_wire(Some("xml")).is_err());
    }

    #[test]
    fn content_type_displays_canonical_tag() {
        assert_eq!(ContentType::Bytes.to_string(), "bytes");
        assert_eq!(ContentType::V8.as_str(), "v8");
        assert_eq!(
            serde_json::to_string(&ContentType::Json).unwrap(),
            "\"json\""
        );
    }

    #[test]
    fn outcome_string_forms() {
        assert_eq!(EventOutcome::ExceededCpu.to_string(), "EXCEEDED_CPU");
        assert_eq!(
            EventOutcome::from_str("EXCEPTION").unwrap(),
            EventOutcome::Exception
        );
        let json = serde_json::to_string(&EventOutcome::Ok).unwrap();
        assert_eq!(json, "\"OK\"");
    }
}
