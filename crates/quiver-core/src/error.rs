// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Quiver queue delivery engine.

use thiserror::Error;

/// The primary error type used across the producer, codec, and consumer crates.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Validation errors: undefined bodies, unsupported content types, value kinds
    /// that do not match the declared content type, empty batches.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// The broker answered with something other than HTTP 200.
    #[error("{operation} failed: {status_text}")]
    Delivery {
        operation: &'static str,
        status: u16,
        status_text: String,
    },

    /// The HTTP transport failed before a status was received.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON conversion errors, propagated as-is.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Structured-format bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A batch was delivered but no handler or listener is registered for it.
    #[error("{0}")]
    MissingHandler(String),

    /// Application handler code failed.
    #[error("handler error: {0}")]
    Handler(String),

    /// The remote dispatcher call failed.
    #[error("rpc error: {message}")]
    Rpc {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueueError {
    /// Shorthand for building a [`QueueError::TypeError`].
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError(message.into())
    }

    /// Returns `true` for validation errors.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeError(_))
    }
}
