// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consumer side of the Quiver queue delivery engine.
//!
//! A delivered batch becomes a [`QueueEvent`] whose [`QueueMessage`]s record
//! ack and retry decisions into a shared [`BatchOutcome`].
//! [`QueueCustomEvent`] drives one delivery: it runs the application's
//! [`Entrypoint`] locally under the configured wait policy, or forwards the
//! batch to an [`EventDispatcher`](quiver_core::EventDispatcher) and adopts
//! the decisions made there.

pub mod abort;
pub mod custom_event;
pub mod event;
pub mod handler;
pub mod limits;
pub mod message;
pub mod outcome;
pub mod rpc;
pub mod tasks;

pub use abort::AbortSignal;
pub use custom_event::{InvocationContext, LocalQueueParams, QueueCustomEvent, QueueParams};
pub use event::{CompletionStatus, QueueEvent};
pub use handler::{Entrypoint, Env, ExecutionContext, ExportedHandler, QueueHandler, QueueListener};
pub use limits::WallClockLimits;
pub use message::{IncomingQueueMessage, QueueMessage, QueueRetryOptions};
pub use outcome::{BatchOutcome, SharedOutcome};
pub use rpc::LocalDispatcher;
pub use tasks::WaitUntilTasks;
