// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Convergence fallback over a raw provider client
//!
//! `create` of a resource we already own turns into an update, and `update`
//! of a missing resource turns into a create. Each fallback happens at most
//! once per call, so a provider that claims both "exists" and "missing"
//! yields [`AdapterError::Inconsistent`] instead of bouncing forever.

use super::{AdapterError, Outcome, ResourceAdapter};
use crate::provider::{ProviderClient, ProviderSpec};
use async_trait::async_trait;
use converge_core::{Action, ManagedResource, ProviderError, RetryExecutor};

/// Resource adapter applying convergence fallbacks to a provider client
#[derive(Clone)]
pub struct ConvergingAdapter<P> {
    provider: P,
    retry: RetryExecutor,
}

impl<P: ProviderClient> ConvergingAdapter<P> {
    pub fn new(provider: P, retry: RetryExecutor) -> Self {
        Self { provider, retry }
    }

    fn label(&self, op: &str, name: &str) -> String {
        format!("{}.{} {}", self.provider.kind(), op, name)
    }

    /// Provider create. `Ok(None)` means the name exists and is ours.
    async fn try_create(&self, name: &str, spec: &P::Spec) -> Result<Option<Outcome>, AdapterError> {
        let label = self.label("create", name);
        match self
            .retry
            .execute(&label, || self.provider.create(name, spec))
            .await
        {
            Ok(()) => Ok(Some(Outcome::Created)),
            Err(ProviderError::AlreadyExists { owned: true, .. }) => Ok(None),
            Err(ProviderError::AlreadyExists { owned: false, .. }) => {
                Err(AdapterError::OwnedElsewhere(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Describe, validate and update. `Ok(None)` means the resource is missing.
    async fn try_update(&self, name: &str, spec: &P::Spec) -> Result<Option<Outcome>, AdapterError> {
        let label = self.label("describe", name);
        let current = self
            .retry
            .execute(&label, || self.provider.describe(name))
            .await?;
        let Some(current) = current else {
            return Ok(None);
        };

        if let Some(change) = current.immutable_changes(spec).into_iter().next() {
            return Err(AdapterError::ImmutableField {
                name: name.to_string(),
                field: change.field,
                current: change.current,
                desired: change.desired,
            });
        }

        if current == *spec {
            tracing::debug!(kind = %self.provider.kind(), name, "already up to date");
            return Ok(Some(Outcome::Unchanged));
        }

        let label = self.label("update", name);
        match self
            .retry
            .execute(&label, || self.provider.update(name, spec))
            .await
        {
            Ok(()) => Ok(Some(Outcome::Updated)),
            Err(ProviderError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<P: ProviderClient> ResourceAdapter for ConvergingAdapter<P> {
    type Spec = P::Spec;

    async fn create(&self, resource: &ManagedResource<P::Spec>) -> Result<Outcome, AdapterError> {
        let name = resource.name();
        if let Some(outcome) = self.try_create(name, &resource.spec).await? {
            return Ok(outcome);
        }

        tracing::info!(kind = %self.provider.kind(), name, "already exists, updating instead");
        self.try_update(name, &resource.spec)
            .await?
            .ok_or_else(|| AdapterError::Inconsistent {
                name: name.to_string(),
                action: Action::Create,
            })
    }

    async fn update(&self, resource: &ManagedResource<P::Spec>) -> Result<Outcome, AdapterError> {
        let name = resource.name();
        if let Some(outcome) = self.try_update(name, &resource.spec).await? {
            return Ok(outcome);
        }

        tracing::info!(kind = %self.provider.kind(), name, "not found, creating instead");
        self.try_create(name, &resource.spec)
            .await?
            .ok_or_else(|| AdapterError::Inconsistent {
                name: name.to_string(),
                action: Action::Update,
            })
    }

    async fn delete(&self, resource: &ManagedResource<P::Spec>) -> Result<Outcome, AdapterError> {
        let name = resource.name();
        let label = self.label("delete", name);
        match self
            .retry
            .execute(&label, || self.provider.delete(name))
            .await
        {
            Ok(()) => Ok(Outcome::Deleted),
            Err(ProviderError::NotFound(_)) => Ok(Outcome::Absent),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "converging_tests.rs"]
mod tests;
