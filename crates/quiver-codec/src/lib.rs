// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content codec for queue message bodies.
//!
//! Encodes and decodes message bodies between application [`Value`]s and wire
//! bytes across the four content types: `text`, `bytes`, `json`, and `v8`
//! (the pinned structured format in [`structured`]).
//!
//! # Buffer policies
//!
//! Serializing `text` or `bytes` can avoid copying the source buffer:
//!
//! - A borrowed value with [`BufferPolicy::ShallowReference`] is referenced in
//!   place. Only valid when the caller finishes with the bytes before the value
//!   can change, e.g. a batch encoded synchronously.
//! - An owned value is detached: its buffer moves into the output with no copy.
//! - A borrowed value with [`BufferPolicy::DeepCopy`] is copied.

pub mod json;
pub mod structured;
pub mod value;

use std::borrow::Cow;

use quiver_core::{ContentType, QueueError};

pub use value::Value;

/// Controls whether serialization may reference a borrowed buffer in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPolicy {
    /// Reference borrowed buffers without copying.
    ShallowReference,
    /// Never hand out a reference to a borrowed buffer.
    DeepCopy,
}

/// Serialized message body, either borrowed from the source value or owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serialized<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> Serialized<'a> {
    fn borrowed(data: &'a [u8], policy: BufferPolicy) -> Self {
        let data = match policy {
            BufferPolicy::ShallowReference => Cow::Borrowed(data),
            BufferPolicy::DeepCopy => Cow::Owned(data.to_vec()),
        };
        Self { data }
    }

    fn owned(data: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(data),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` when the bytes still point into the source value.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    pub fn into_owned(self) -> Vec<u8> {
        self.data.into_owned()
    }
}

/// Serializes a body for the given content type.
pub fn serialize<'a>(
    value: Cow<'a, Value>,
    content_type: ContentType,
    policy: BufferPolicy,
) -> Result<Serialized<'a>, QueueError> {
    match content_type {
        ContentType::Text => match value {
            Cow::Borrowed(Value::String(s)) => Ok(Serialized::borrowed(s.as_bytes(), policy)),
            Cow::Owned(Value::String(s)) => Ok(Serialized::owned(s.into_bytes())),
            other => Err(kind_mismatch(content_type, "string", &other)),
        },
        ContentType::Bytes => match value {
            Cow::Borrowed(Value::Bytes(b)) => Ok(Serialized::borrowed(b, policy)),
            Cow::Owned(Value::Bytes(b)) => Ok(Serialized::owned(b)),
            other => Err(kind_mismatch(content_type, "ArrayBufferView", &other)),
        },
        ContentType::Json => Ok(Serialized::owned(json::to_json(&value)?.into_bytes())),
        ContentType::V8 => Ok(Serialized::owned(structured::serialize(&value))),
    }
}

/// Deserializes a borrowed body. The result never references `body`.
pub fn deserialize(body: &[u8], content_type: ContentType) -> Result<Value, QueueError> {
    match content_type {
        ContentType::Text => Ok(Value::String(String::from_utf8_lossy(body).into_owned())),
        ContentType::Bytes => Ok(Value::Bytes(body.to_vec())),
        ContentType::Json => json::from_json(body),
        ContentType::V8 => structured::deserialize(body),
    }
}

/// Deserializes an owned body, reusing its allocation for `text` and `bytes`.
pub fn deserialize_owned(body: Vec<u8>, content_type: ContentType) -> Result<Value, QueueError> {
    match content_type {
        ContentType::Text => Ok(Value::String(
            String::from_utf8(body)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        )),
        ContentType::Bytes => Ok(Value::Bytes(body)),
        other => deserialize(&body, other),
    }
}

fn kind_mismatch(content_type: ContentType, expected: &str, value: &Value) -> QueueError {
    QueueError::type_error(format!(
        "Content Type \"{content_type}\" requires a value of type {expected}, but received: {}",
        value.type_of()
    ))
}
