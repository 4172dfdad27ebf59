// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! converge-core: data model and retry policy for the reconciliation engine
//!
//! This crate provides:
//! - Resource identity, snapshots and version cursors
//! - Watch events and the actions they request
//! - The provider error taxonomy with explicit retry classification
//! - The transient-error retry executor

pub mod cursor;
pub mod error;
pub mod event;
pub mod resource;
pub mod retry;

pub use cursor::{InvalidVersion, ReconciliationCursor, ResourceVersion};
pub use error::{Classify, NetworkReason, ProviderError, RetryClass};
pub use event::{Action, EventType, WatchEvent};
pub use resource::{ManagedResource, ResourceKey, ResourceKind, ResourceList};
pub use retry::{RetryExecutor, RetryPolicy};
