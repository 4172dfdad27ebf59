// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake watch source for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SourceError, WatchSource, WatchStream};
use async_trait::async_trait;
use converge_core::{ResourceKind, ResourceList, ResourceVersion, WatchEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

/// Recorded watch source call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCall {
    List,
    Watch { from: ResourceVersion },
}

enum ScriptedWatch<S> {
    Stream(WatchStream<S>),
    Fail(SourceError),
}

struct FakeState<S> {
    lists: VecDeque<Result<ResourceList<S>, SourceError>>,
    watches: VecDeque<ScriptedWatch<S>>,
    calls: Vec<SourceCall>,
    /// Senders of watches handed out after the script ran out, kept so they never close
    idle: Vec<mpsc::Sender<WatchEvent<S>>>,
}

/// Scripted watch source.
///
/// Lists and watches are answered in the order they were pushed. Once the
/// script is exhausted, `list` never returns and `watch` yields a stream that
/// stays open without events.
pub struct FakeWatchSource<S> {
    kind: ResourceKind,
    state: Arc<Mutex<FakeState<S>>>,
    called: Arc<Notify>,
}

impl<S> Clone for FakeWatchSource<S> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            state: Arc::clone(&self.state),
            called: Arc::clone(&self.called),
        }
    }
}

impl<S: Clone + Send + Sync + 'static> FakeWatchSource<S> {
    pub fn new(kind: impl Into<ResourceKind>) -> Self {
        Self {
            kind: kind.into(),
            state: Arc::new(Mutex::new(FakeState {
                lists: VecDeque::new(),
                watches: VecDeque::new(),
                calls: Vec::new(),
                idle: Vec::new(),
            })),
            called: Arc::new(Notify::new()),
        }
    }

    /// Answer the next list with `list`
    pub fn push_list(&self, list: ResourceList<S>) {
        self.lock().lists.push_back(Ok(list));
    }

    /// Fail the next list with `error`
    pub fn push_list_error(&self, error: SourceError) {
        self.lock().lists.push_back(Err(error));
    }

    /// Answer the next watch with `events`, then end the stream
    pub fn push_watch(&self, events: Vec<WatchEvent<S>>) {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event
            let _ = tx.try_send(event);
        }
        self.lock().watches.push_back(ScriptedWatch::Stream(rx));
    }

    /// Answer the next watch with a stream driven by the returned sender.
    /// Dropping the sender ends the stream.
    pub fn push_open_watch(&self) -> mpsc::Sender<WatchEvent<S>> {
        let (tx, rx) = mpsc::channel(64);
        self.lock().watches.push_back(ScriptedWatch::Stream(rx));
        tx
    }

    /// Fail the next watch with `error`
    pub fn push_watch_error(&self, error: SourceError) {
        self.lock().watches.push_back(ScriptedWatch::Fail(error));
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SourceCall> {
        self.lock().calls.clone()
    }

    pub fn list_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SourceCall::List))
            .count()
    }

    /// Versions each watch was opened from, in order
    pub fn watch_origins(&self) -> Vec<ResourceVersion> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SourceCall::Watch { from } => Some(*from),
                SourceCall::List => None,
            })
            .collect()
    }

    /// Wait until at least `count` calls have been made
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.called.notified();
            if self.lock().calls.len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState<S>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: SourceCall) {
        self.lock().calls.push(call);
        self.called.notify_waiters();
    }
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> WatchSource for FakeWatchSource<S> {
    type Spec = S;

    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn list(&self) -> Result<ResourceList<S>, SourceError> {
        self.record(SourceCall::List);
        let next = self.lock().lists.pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn watch(&self, from: ResourceVersion) -> Result<WatchStream<S>, SourceError> {
        self.record(SourceCall::Watch { from });
        let mut state = self.lock();
        match state.watches.pop_front() {
            Some(ScriptedWatch::Stream(rx)) => Ok(rx),
            Some(ScriptedWatch::Fail(error)) => Err(error),
            None => {
                let (tx, rx) = mpsc::channel(1);
                state.idle.push(tx);
                Ok(rx)
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
