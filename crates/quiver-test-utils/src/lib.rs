// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Quiver integration tests.
//!
//! Deterministic stand-ins for the collaborators a delivery needs, so that
//! coordinator and bridge behaviour can be tested without a broker or a
//! remote dispatcher.
//!
//! # Components
//!
//! - [`MockDispatcher`] - Dispatcher with scripted responses and request capture
//! - [`FnHandler`] / [`FnListener`] - Handlers and listeners built from closures
//! - [`ManualLimits`] - Limit enforcer triggered by the test
//! - [`BatchBuilder`] - Local batches and dispatcher requests

pub mod batch;
pub mod handlers;
pub mod limits;
pub mod mock_dispatcher;

pub use batch::BatchBuilder;
pub use handlers::{FnHandler, FnListener, NeverSettles};
pub use limits::ManualLimits;
pub use mock_dispatcher::MockDispatcher;
