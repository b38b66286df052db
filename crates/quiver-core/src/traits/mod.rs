// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams to the collaborators the delivery engine consumes but does not own.
//!
//! All async traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod dispatcher;
pub mod limits;

pub use dispatcher::EventDispatcher;
pub use limits::LimitEnforcer;
