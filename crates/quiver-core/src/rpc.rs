// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire shapes exchanged with a remote event dispatcher.

use serde::{Deserialize, Serialize};

use crate::types::EventOutcome;

/// One message as carried over the dispatcher boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcQueueMessage {
    pub id: String,
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: i64,
    pub data: Vec<u8>,
    /// Empty when the sender did not tag the message.
    #[serde(default)]
    pub content_type: String,
    pub attempts: u16,
}

/// Request sent to the dispatcher for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRequest {
    pub queue_name: String,
    pub messages: Vec<RpcQueueMessage>,
}

/// Batch-wide retry decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryBatch {
    pub retry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u32>,
}

/// Per-message retry decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRetryMessage {
    pub msg_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u32>,
}

/// Response returned by the dispatcher once the batch has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub outcome: EventOutcome,
    pub ack_all: bool,
    pub retry_batch: RetryBatch,
    pub explicit_acks: Vec<String>,
    pub retry_messages: Vec<QueueRetryMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_camel_case_fields() {
        let resp = QueueResponse {
            outcome: EventOutcome::Ok,
            ack_all: false,
            retry_batch: RetryBatch {
                retry: true,
                delay_seconds: Some(10),
            },
            explicit_acks: vec!["m1".into()],
            retry_messages: vec![QueueRetryMessage {
                msg_id: "m2".into(),
                delay_seconds: None,
            }],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["ackAll"], false);
        assert_eq!(json["retryBatch"]["delaySeconds"], 10);
        assert_eq!(json["retryMessages"][0]["msgId"], "m2");
        assert!(json["retryMessages"][0].get("delaySeconds").is_none());
    }

    #[test]
    fn message_without_content_type_parses() {
        let msg: RpcQueueMessage = serde_json::from_str(
            r#"{"id":"a","timestampNs":5,"data":[1,2],"attempts":1}"#,
        )
        .unwrap();
        assert_eq!(msg.content_type, "");
        assert_eq!(msg.data, vec![1, 2]);
    }
}
