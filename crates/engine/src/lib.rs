// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! converge reconciliation engine

mod controller;
mod error;
mod reconcile;
mod serializer;

pub use controller::Controller;
pub use error::{EngineError, SerializerError};
pub use reconcile::{Reconciler, ReconcilerConfig};
pub use serializer::{KeyedSerializer, Pending};
