// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound queue sender.
//!
//! Serializes application values and delivers them to the broker channel bound
//! to a queue, either one at a time ([`QueueProducer::send`]) or as a JSON
//! batch envelope ([`QueueProducer::send_batch`]).

pub mod client;
pub mod envelope;
pub mod types;

pub use client::QueueProducer;
pub use envelope::{BatchEnvelope, encode_batch};
pub use types::{MessageSendRequest, SendBatchOptions, SendOptions};
