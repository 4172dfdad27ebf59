// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: watch sources, provider clients and the
//! resource adapters built on them

pub mod provider;
pub mod resource;
pub mod source;
pub mod traced;

pub use provider::{
    DryRunProvider, FieldChange, HttpProvider, HttpProviderConfig, ProviderClient, ProviderSpec,
};
pub use resource::{AdapterError, ConvergingAdapter, Outcome, ResourceAdapter};
pub use source::{HttpWatchSource, HttpWatchSourceConfig, SourceError, WatchSource, WatchStream};
pub use traced::TracedResourceAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use provider::{FakeProvider, ProviderCall, ProviderOp};
#[cfg(any(test, feature = "test-support"))]
pub use resource::{AdapterCall, FakeResourceAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use source::{FakeWatchSource, SourceCall};
