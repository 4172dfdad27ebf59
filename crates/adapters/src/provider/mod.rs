// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider clients: raw API calls for one resource kind

mod dry_run;
mod http;

pub use dry_run::DryRunProvider;
pub use http::{HttpProvider, HttpProviderConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProvider, ProviderCall, ProviderOp};

use async_trait::async_trait;
use converge_core::{ProviderError, ResourceKind};
use std::fmt;

/// A change to an attribute that is fixed at creation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub current: String,
    pub desired: String,
}

impl FieldChange {
    pub fn new(
        field: impl Into<String>,
        current: impl fmt::Display,
        desired: impl fmt::Display,
    ) -> Self {
        Self {
            field: field.into(),
            current: current.to_string(),
            desired: desired.to_string(),
        }
    }
}

/// Provider-side representation of a declared spec
pub trait ProviderSpec: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Immutable attributes that differ between the live resource and `desired`
    fn immutable_changes(&self, _desired: &Self) -> Vec<FieldChange> {
        Vec::new()
    }
}

/// Raw provider operations for one resource kind.
///
/// Implementations report conditions through [`ProviderError`] and never retry;
/// retries and convergence fallbacks live in [`crate::ConvergingAdapter`].
#[async_trait]
pub trait ProviderClient: Clone + Send + Sync + 'static {
    type Spec: ProviderSpec;

    fn kind(&self) -> &ResourceKind;

    /// Fetch the live spec, `None` if the resource does not exist
    async fn describe(&self, name: &str) -> Result<Option<Self::Spec>, ProviderError>;

    /// Create a new resource. Fails with `AlreadyExists` if the name is taken.
    async fn create(&self, name: &str, spec: &Self::Spec) -> Result<(), ProviderError>;

    /// Mutate an existing resource. Fails with `NotFound` if it is missing.
    async fn update(&self, name: &str, spec: &Self::Spec) -> Result<(), ProviderError>;

    /// Remove a resource. Fails with `NotFound` if it is missing.
    async fn delete(&self, name: &str) -> Result<(), ProviderError>;
}
