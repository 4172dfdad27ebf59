// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-kind controller: one reconciler task per resource kind

use crate::error::EngineError;
use crate::reconcile::Reconciler;
use converge_adapters::{ResourceAdapter, WatchSource};
use converge_core::ResourceKind;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns the running reconcilers and their shared shutdown signal
#[derive(Debug)]
pub struct Controller {
    shutdown: watch::Sender<bool>,
    running: Vec<(ResourceKind, JoinHandle<()>)>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            running: Vec::new(),
        }
    }

    /// Start a reconciler; fails if its initial list fails
    pub async fn spawn<W, A>(&mut self, reconciler: Reconciler<W, A>) -> Result<(), EngineError>
    where
        W: WatchSource,
        A: ResourceAdapter<Spec = W::Spec>,
    {
        let kind = reconciler.kind().clone();
        let handle = reconciler.start(self.shutdown.subscribe()).await?;
        tracing::info!(%kind, "reconciler started");
        self.running.push((kind, handle));
        Ok(())
    }

    /// Kinds with a running reconciler
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.running.iter().map(|(kind, _)| kind.clone()).collect()
    }

    /// Stop every reconciler and wait for their queued jobs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (kind, handle) in self.running {
            if let Err(e) = handle.await {
                tracing::error!(%kind, error = %e, "reconciler task failed");
            }
        }
        tracing::info!("controller stopped");
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
