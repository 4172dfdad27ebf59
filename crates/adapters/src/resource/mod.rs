// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource adapters: create/update/delete for one resource kind

mod converging;

pub use converging::ConvergingAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AdapterCall, FakeResourceAdapter};

use async_trait::async_trait;
use converge_core::{Action, ManagedResource, ProviderError};
use std::fmt;
use thiserror::Error;

/// What an adapter call did to the provider resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// Already matched the declared spec
    Unchanged,
    Deleted,
    /// Delete of a resource the provider no longer has
    Absent,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Unchanged => "unchanged",
            Outcome::Deleted => "deleted",
            Outcome::Absent => "absent",
        };
        write!(f, "{}", s)
    }
}

/// Errors from resource adapter operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("immutable field {field} of {name} cannot change from {current:?} to {desired:?}")]
    ImmutableField {
        name: String,
        field: String,
        current: String,
        desired: String,
    },
    #[error("{0} already exists and is owned by another controller")]
    OwnedElsewhere(String),
    #[error("{name} changed underneath {action}: provider reported both exists and missing")]
    Inconsistent { name: String, action: Action },
    #[error("invalid spec for {name}: {message}")]
    InvalidSpec { name: String, message: String },
}

/// Adapter converging one resource kind at an external provider
#[async_trait]
pub trait ResourceAdapter: Clone + Send + Sync + 'static {
    type Spec: Clone + Send + Sync + 'static;

    /// Create the resource; an existing resource owned by us is updated instead
    async fn create(&self, resource: &ManagedResource<Self::Spec>)
        -> Result<Outcome, AdapterError>;

    /// Update the resource; a missing resource is created instead.
    /// A resource already matching the spec is left alone.
    async fn update(&self, resource: &ManagedResource<Self::Spec>)
        -> Result<Outcome, AdapterError>;

    /// Remove the resource
    async fn delete(&self, resource: &ManagedResource<Self::Spec>)
        -> Result<Outcome, AdapterError>;

    /// Dispatch an action to the matching operation
    async fn apply(
        &self,
        action: Action,
        resource: &ManagedResource<Self::Spec>,
    ) -> Result<Outcome, AdapterError> {
        match action {
            Action::Create => self.create(resource).await,
            Action::Update => self.update(resource).await,
            Action::Delete => self.delete(resource).await,
        }
    }
}
