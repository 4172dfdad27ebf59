// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake provider client for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ProviderClient, ProviderSpec};
use async_trait::async_trait;
use converge_core::{ProviderError, ResourceKind};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Provider operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    Describe,
    Create,
    Update,
    Delete,
}

/// Recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall<S> {
    Describe { name: String },
    Create { name: String, spec: S },
    Update { name: String, spec: S },
    Delete { name: String },
}

impl<S> ProviderCall<S> {
    pub fn op(&self) -> ProviderOp {
        match self {
            ProviderCall::Describe { .. } => ProviderOp::Describe,
            ProviderCall::Create { .. } => ProviderOp::Create,
            ProviderCall::Update { .. } => ProviderOp::Update,
            ProviderCall::Delete { .. } => ProviderOp::Delete,
        }
    }
}

#[derive(Debug, Clone)]
struct FakeEntry<S> {
    spec: S,
    owned: bool,
}

struct FakeState<S> {
    resources: HashMap<String, FakeEntry<S>>,
    calls: Vec<ProviderCall<S>>,
    failures: HashMap<ProviderOp, VecDeque<ProviderError>>,
}

/// In-memory provider with call recording and failure injection
#[derive(Clone)]
pub struct FakeProvider<S> {
    kind: ResourceKind,
    state: Arc<Mutex<FakeState<S>>>,
}

impl<S: ProviderSpec> FakeProvider<S> {
    pub fn new(kind: impl Into<ResourceKind>) -> Self {
        Self {
            kind: kind.into(),
            state: Arc::new(Mutex::new(FakeState {
                resources: HashMap::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
            })),
        }
    }

    /// Seed a resource owned by this controller
    pub fn insert(&self, name: &str, spec: S) {
        self.lock()
            .resources
            .insert(name.to_string(), FakeEntry { spec, owned: true });
    }

    /// Seed a resource owned by someone else
    pub fn insert_foreign(&self, name: &str, spec: S) {
        self.lock()
            .resources
            .insert(name.to_string(), FakeEntry { spec, owned: false });
    }

    /// Live spec of a resource
    pub fn get(&self, name: &str) -> Option<S> {
        self.lock().resources.get(name).map(|e| e.spec.clone())
    }

    /// Queue an error returned by the next call of `op` (before any state change)
    pub fn fail_next(&self, op: ProviderOp, error: ProviderError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProviderCall<S>> {
        self.lock().calls.clone()
    }

    /// Count recorded calls of one operation
    pub fn count(&self, op: ProviderOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState<S>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: ProviderCall<S>) -> Result<(), ProviderError> {
        let mut state = self.lock();
        let op = call.op();
        state.calls.push(call);
        match state.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<S: ProviderSpec> ProviderClient for FakeProvider<S> {
    type Spec = S;

    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn describe(&self, name: &str) -> Result<Option<S>, ProviderError> {
        self.record(ProviderCall::Describe {
            name: name.to_string(),
        })?;
        Ok(self.get(name))
    }

    async fn create(&self, name: &str, spec: &S) -> Result<(), ProviderError> {
        self.record(ProviderCall::Create {
            name: name.to_string(),
            spec: spec.clone(),
        })?;

        let mut state = self.lock();
        if let Some(existing) = state.resources.get(name) {
            return Err(ProviderError::AlreadyExists {
                name: name.to_string(),
                owned: existing.owned,
            });
        }
        state.resources.insert(
            name.to_string(),
            FakeEntry {
                spec: spec.clone(),
                owned: true,
            },
        );
        Ok(())
    }

    async fn update(&self, name: &str, spec: &S) -> Result<(), ProviderError> {
        self.record(ProviderCall::Update {
            name: name.to_string(),
            spec: spec.clone(),
        })?;

        let mut state = self.lock();
        match state.resources.get_mut(name) {
            Some(entry) => {
                entry.spec = spec.clone();
                Ok(())
            }
            None => Err(ProviderError::NotFound(name.to_string())),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        self.record(ProviderCall::Delete {
            name: name.to_string(),
        })?;

        match self.lock().resources.remove(name) {
            Some(_) => Ok(()),
            None => Err(ProviderError::NotFound(name.to_string())),
        }
    }
}
