// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch-driven reconciliation loop for one resource kind
//!
//! A reconciler lists the declared collection, enqueues an update for every
//! item, then watches from the list's version. When the watch stream ends it
//! lists again. All jobs for a resource name go through one
//! [`KeyedSerializer`], so the provider sees them in observation order.

use crate::error::EngineError;
use crate::serializer::KeyedSerializer;
use converge_adapters::{ResourceAdapter, SourceError, WatchSource};
use converge_core::{
    Action, ManagedResource, ReconciliationCursor, ResourceKind, ResourceVersion, WatchEvent,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Loop timing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Pause before listing again after a failed list or watch
    pub relist_delay: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            relist_delay: Duration::from_secs(1),
        }
    }
}

/// Reconciler for one kind
pub struct Reconciler<W, A> {
    source: W,
    adapter: A,
    serializer: KeyedSerializer<()>,
    cursor: ReconciliationCursor,
    config: ReconcilerConfig,
}

impl<W, A> Reconciler<W, A>
where
    W: WatchSource,
    A: ResourceAdapter<Spec = W::Spec>,
{
    pub fn new(source: W, adapter: A, config: ReconcilerConfig) -> Self {
        Self {
            source,
            adapter,
            serializer: KeyedSerializer::new(),
            cursor: ReconciliationCursor::default(),
            config,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        self.source.kind()
    }

    pub fn cursor(&self) -> ResourceVersion {
        self.cursor.current()
    }

    /// Take the initial baseline and spawn the watch loop.
    ///
    /// A failing initial list is returned to the caller; later failures are
    /// logged and retried by the loop.
    pub async fn start(
        mut self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, EngineError> {
        if let Err(source) = self.resync().await {
            return Err(EngineError::InitialList {
                kind: self.source.kind().clone(),
                source,
            });
        }
        Ok(tokio::spawn(self.run(shutdown)))
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let kind = self.source.kind().clone();
        tracing::info!(%kind, version = %self.cursor(), "watching");

        let mut listed = true;
        'outer: loop {
            if !listed {
                let result = tokio::select! {
                    _ = stopped(&mut shutdown) => break 'outer,
                    result = self.resync() => result,
                };
                if let Err(e) = result {
                    tracing::warn!(%kind, error = %e, "relist failed");
                    if self.pause(&mut shutdown).await {
                        break 'outer;
                    }
                    continue;
                }
            }
            listed = false;

            let from = self.cursor();
            let opened = tokio::select! {
                _ = stopped(&mut shutdown) => break 'outer,
                opened = self.source.watch(from) => opened,
            };
            let mut stream = match opened {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(%kind, version = %from, error = %e, "cannot open watch");
                    if self.pause(&mut shutdown).await {
                        break 'outer;
                    }
                    continue;
                }
            };

            loop {
                tokio::select! {
                    _ = stopped(&mut shutdown) => break 'outer,
                    event = stream.recv() => match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            tracing::info!(%kind, version = %self.cursor(), "watch stream ended, relisting");
                            break;
                        }
                    },
                }
            }
        }

        tracing::info!(%kind, "stopping, waiting for queued jobs");
        self.serializer.shutdown().await;
        tracing::info!(%kind, "stopped");
    }

    /// List the collection, reset the cursor and enqueue an update per item
    async fn resync(&mut self) -> Result<(), SourceError> {
        let list = self.source.list().await?;
        tracing::info!(
            kind = %self.source.kind(),
            version = %list.version,
            items = list.len(),
            "listed"
        );
        self.cursor.rebase(list.version);
        for resource in list.items {
            self.enqueue(Action::Update, resource);
        }
        Ok(())
    }

    fn handle_event(&mut self, event: WatchEvent<W::Spec>) {
        match event {
            WatchEvent::Error { code, message } => {
                tracing::warn!(kind = %self.source.kind(), ?code, %message, "watch source reported an error");
            }
            WatchEvent::Unrecognized { event_type } => {
                tracing::warn!(kind = %self.source.kind(), %event_type, "ignoring unrecognized watch event");
            }
            event => {
                tracing::debug!(kind = %self.source.kind(), event = event.name(), "watch event");
                if let Some((action, resource)) = event.into_action() {
                    self.cursor.observe(resource.resource_version);
                    self.enqueue(action, resource);
                }
            }
        }
    }

    fn enqueue(&self, action: Action, resource: ManagedResource<W::Spec>) {
        let adapter = self.adapter.clone();
        let key = resource.name().to_string();
        let job = async move {
            match adapter.apply(action, &resource).await {
                Ok(outcome) => tracing::info!(
                    kind = %resource.kind(),
                    name = resource.name(),
                    version = %resource.resource_version,
                    %action,
                    %outcome,
                    "reconciled"
                ),
                Err(e) => tracing::error!(
                    kind = %resource.kind(),
                    name = resource.name(),
                    version = %resource.resource_version,
                    %action,
                    error = %e,
                    "reconcile failed"
                ),
            }
        };
        // Outcomes are logged by the job itself
        drop(self.serializer.enqueue(key, job));
    }

    /// Wait out the relist delay. Returns true if shutdown was requested meanwhile.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = stopped(shutdown) => true,
            _ = tokio::time::sleep(self.config.relist_delay) => false,
        }
    }
}

/// Resolves once shutdown is requested or the controller is gone
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
