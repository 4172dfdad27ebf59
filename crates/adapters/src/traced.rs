// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::resource::{AdapterError, Outcome, ResourceAdapter};
use async_trait::async_trait;
use converge_core::{Action, ManagedResource};
use tracing::Instrument;

/// Wrapper that adds tracing to any ResourceAdapter
#[derive(Clone)]
pub struct TracedResourceAdapter<A> {
    inner: A,
}

impl<A> TracedResourceAdapter<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: ResourceAdapter> TracedResourceAdapter<A> {
    async fn traced(
        &self,
        action: Action,
        resource: &ManagedResource<A::Spec>,
    ) -> Result<Outcome, AdapterError> {
        // Precondition: every provider call is addressed by name
        if resource.name().trim().is_empty() {
            tracing::error!("resource has no name");
            return Err(AdapterError::InvalidSpec {
                name: String::new(),
                message: "resource name is empty".to_string(),
            });
        }

        tracing::debug!("starting");

        let start = std::time::Instant::now();
        let result = match action {
            Action::Create => self.inner.create(resource).await,
            Action::Update => self.inner.update(resource).await,
            Action::Delete => self.inner.delete(resource).await,
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(outcome @ (Outcome::Unchanged | Outcome::Absent)) => {
                tracing::debug!(elapsed_ms, %outcome, "nothing to do")
            }
            Ok(outcome) => tracing::info!(elapsed_ms, %outcome, "converged"),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "failed"),
        }

        result
    }
}

#[async_trait]
impl<A: ResourceAdapter> ResourceAdapter for TracedResourceAdapter<A> {
    type Spec = A::Spec;

    async fn create(&self, resource: &ManagedResource<A::Spec>) -> Result<Outcome, AdapterError> {
        let span = tracing::info_span!(
            "resource.create",
            kind = %resource.kind(),
            name = resource.name(),
            version = %resource.resource_version
        );
        self.traced(Action::Create, resource).instrument(span).await
    }

    async fn update(&self, resource: &ManagedResource<A::Spec>) -> Result<Outcome, AdapterError> {
        let span = tracing::info_span!(
            "resource.update",
            kind = %resource.kind(),
            name = resource.name(),
            version = %resource.resource_version
        );
        self.traced(Action::Update, resource).instrument(span).await
    }

    async fn delete(&self, resource: &ManagedResource<A::Spec>) -> Result<Outcome, AdapterError> {
        let span = tracing::info_span!(
            "resource.delete",
            kind = %resource.kind(),
            name = resource.name(),
            version = %resource.resource_version
        );
        self.traced(Action::Delete, resource).instrument(span).await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
