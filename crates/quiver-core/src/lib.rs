// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Quiver queue delivery engine.
//!
//! This crate provides the error type, the content-type and outcome enums,
//! the dispatcher wire shapes, and the collaborator traits used throughout
//! the workspace.

pub mod error;
pub mod rpc;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::QueueError;
pub use rpc::{QueueRequest, QueueResponse, QueueRetryMessage, RetryBatch, RpcQueueMessage};
pub use traits::{EventDispatcher, LimitEnforcer};
pub use types::{ContentType, CustomEventResult, EventOutcome};
