// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dry-run provider that only logs what it would do

use super::{ProviderClient, ProviderSpec};
use async_trait::async_trait;
use converge_core::{ProviderError, ResourceKind};
use std::marker::PhantomData;

/// Provider that reports every resource as absent and accepts every change
#[derive(Clone)]
pub struct DryRunProvider<S> {
    kind: ResourceKind,
    _spec: PhantomData<fn() -> S>,
}

impl<S> DryRunProvider<S> {
    pub fn new(kind: impl Into<ResourceKind>) -> Self {
        Self {
            kind: kind.into(),
            _spec: PhantomData,
        }
    }
}

#[async_trait]
impl<S: ProviderSpec> ProviderClient for DryRunProvider<S> {
    type Spec = S;

    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn describe(&self, _name: &str) -> Result<Option<S>, ProviderError> {
        Ok(None)
    }

    async fn create(&self, name: &str, spec: &S) -> Result<(), ProviderError> {
        tracing::info!(kind = %self.kind, name, ?spec, "dry run: would create");
        Ok(())
    }

    async fn update(&self, name: &str, spec: &S) -> Result<(), ProviderError> {
        tracing::info!(kind = %self.kind, name, ?spec, "dry run: would update");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        tracing::info!(kind = %self.kind, name, "dry run: would delete");
        Ok(())
    }
}
