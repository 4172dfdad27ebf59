// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake resource adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{AdapterError, Outcome, ResourceAdapter};
use async_trait::async_trait;
use converge_core::{Action, ManagedResource, ResourceVersion};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Recorded adapter call
#[derive(Debug, Clone)]
pub struct AdapterCall {
    pub action: Action,
    pub name: String,
    pub version: ResourceVersion,
    pub started_at: Instant,
    /// `None` while the call is still running
    pub finished_at: Option<Instant>,
    pub result: Option<Result<Outcome, AdapterError>>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<AdapterCall>,
    in_flight: HashMap<String, usize>,
    overlaps: usize,
    delays: HashMap<String, Duration>,
    failures: HashMap<(String, Action), VecDeque<AdapterError>>,
}

/// Fake resource adapter recording calls, timings and same-name overlaps
#[derive(Clone)]
pub struct FakeResourceAdapter<S> {
    state: Arc<Mutex<FakeState>>,
    settled: Arc<Notify>,
    _spec: std::marker::PhantomData<fn() -> S>,
}

impl<S> Default for FakeResourceAdapter<S> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            settled: Arc::new(Notify::new()),
            _spec: std::marker::PhantomData,
        }
    }
}

impl<S> FakeResourceAdapter<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call for `name` take `delay`
    pub fn set_delay(&self, name: &str, delay: Duration) {
        self.lock().delays.insert(name.to_string(), delay);
    }

    /// Fail the next `action` on `name` with `error`
    pub fn fail_next(&self, name: &str, action: Action, error: AdapterError) {
        self.lock()
            .failures
            .entry((name.to_string(), action))
            .or_default()
            .push_back(error);
    }

    /// Get all recorded calls, in start order
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.lock().calls.clone()
    }

    /// `(action, name)` pairs in start order
    pub fn actions(&self) -> Vec<(Action, String)> {
        self.lock()
            .calls
            .iter()
            .map(|c| (c.action, c.name.clone()))
            .collect()
    }

    /// Actions started for one name, in start order
    pub fn actions_for(&self, name: &str) -> Vec<Action> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.action)
            .collect()
    }

    /// Number of times a call started while another call for the same name was running
    pub fn overlaps(&self) -> usize {
        self.lock().overlaps
    }

    /// Number of calls that have finished
    pub fn settled_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.finished_at.is_some())
            .count()
    }

    /// Wait until at least `count` calls have finished
    pub async fn wait_for_settled(&self, count: usize) {
        loop {
            let notified = self.settled.notified();
            if self.settled_count() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run(
        &self,
        action: Action,
        resource_name: &str,
        version: ResourceVersion,
        success: Outcome,
    ) -> Result<Outcome, AdapterError> {
        let (index, delay, failure) = {
            let mut state = self.lock();
            let running = state.in_flight.entry(resource_name.to_string()).or_insert(0);
            *running += 1;
            if *running > 1 {
                state.overlaps += 1;
            }
            state.calls.push(AdapterCall {
                action,
                name: resource_name.to_string(),
                version,
                started_at: Instant::now(),
                finished_at: None,
                result: None,
            });
            let index = state.calls.len() - 1;
            let delay = state.delays.get(resource_name).copied();
            let failure = state
                .failures
                .get_mut(&(resource_name.to_string(), action))
                .and_then(|q| q.pop_front());
            (index, delay, failure)
        };

        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        let result = match failure {
            Some(error) => Err(error),
            None => Ok(success),
        };

        {
            let mut state = self.lock();
            if let Some(running) = state.in_flight.get_mut(resource_name) {
                *running = running.saturating_sub(1);
            }
            if let Some(call) = state.calls.get_mut(index) {
                call.finished_at = Some(Instant::now());
                call.result = Some(result.clone());
            }
        }
        self.settled.notify_waiters();

        result
    }
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> ResourceAdapter for FakeResourceAdapter<S> {
    type Spec = S;

    async fn create(&self, resource: &ManagedResource<S>) -> Result<Outcome, AdapterError> {
        self.run(
            Action::Create,
            resource.name(),
            resource.resource_version,
            Outcome::Created,
        )
        .await
    }

    async fn update(&self, resource: &ManagedResource<S>) -> Result<Outcome, AdapterError> {
        self.run(
            Action::Update,
            resource.name(),
            resource.resource_version,
            Outcome::Updated,
        )
        .await
    }

    async fn delete(&self, resource: &ManagedResource<S>) -> Result<Outcome, AdapterError> {
        self.run(
            Action::Delete,
            resource.name(),
            resource.resource_version,
            Outcome::Deleted,
        )
        .await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
