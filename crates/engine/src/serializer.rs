// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key job serialization
//!
//! Jobs enqueued under the same key run one at a time, in enqueue order.
//! Each active key has one worker task draining its chain; the worker
//! removes the key's entry and exits once the chain is empty. Every job runs
//! in its own task so a panic reaches only that job's caller.

use crate::error::SerializerError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

struct Queued<T> {
    job: Job<T>,
    reply: oneshot::Sender<Result<T, SerializerError>>,
}

struct Chain<T> {
    tx: mpsc::UnboundedSender<Queued<T>>,
    generation: u64,
    /// Jobs enqueued and not yet settled
    outstanding: usize,
    worker: Option<JoinHandle<()>>,
}

struct Chains<T> {
    chains: HashMap<String, Chain<T>>,
    next_generation: u64,
    closed: bool,
}

/// Runs jobs one at a time per key
pub struct KeyedSerializer<T> {
    inner: Arc<Mutex<Chains<T>>>,
}

impl<T> Clone for KeyedSerializer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for KeyedSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one enqueued job.
///
/// Dropping it does not cancel the job.
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, SerializerError>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T, SerializerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(SerializerError::Closed)))
    }
}

impl<T: Send + 'static> KeyedSerializer<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Chains {
                chains: HashMap::new(),
                next_generation: 0,
                closed: false,
            })),
        }
    }

    /// Append `job` to the chain for `key`.
    ///
    /// The job starts once every job enqueued before it under the same key
    /// has settled.
    pub fn enqueue<F>(&self, key: impl Into<String>, job: F) -> Pending<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let key = key.into();
        let (reply, rx) = oneshot::channel();
        let mut queued = Queued {
            job: Box::pin(job),
            reply,
        };

        let mut inner = self.lock();
        if inner.closed {
            let _ = queued.reply.send(Err(SerializerError::Closed));
            return Pending { rx };
        }

        if let Some(chain) = inner.chains.get_mut(&key) {
            match chain.tx.send(queued) {
                Ok(()) => {
                    chain.outstanding += 1;
                    return Pending { rx };
                }
                // Worker gone without removing its entry; start a fresh chain
                Err(mpsc::error::SendError(returned)) => queued = returned,
            }
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        let (tx, chain_rx) = mpsc::unbounded_channel();
        let _ = tx.send(queued);
        let worker = tokio::spawn(drain(
            Arc::clone(&self.inner),
            key.clone(),
            generation,
            chain_rx,
        ));
        inner.chains.insert(
            key,
            Chain {
                tx,
                generation,
                outstanding: 1,
                worker: Some(worker),
            },
        );

        Pending { rx }
    }

    /// Number of keys with unsettled jobs
    pub fn active_keys(&self) -> usize {
        self.lock().chains.len()
    }

    /// Stop accepting jobs and wait for every queued job to settle
    pub async fn shutdown(&self) {
        let workers: Vec<JoinHandle<()>> = {
            let mut inner = self.lock();
            inner.closed = true;
            inner
                .chains
                .values_mut()
                .filter_map(|chain| chain.worker.take())
                .collect()
        };

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "serializer worker failed");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Chains<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Worker loop for one key's chain
async fn drain<T: Send + 'static>(
    inner: Arc<Mutex<Chains<T>>>,
    key: String,
    generation: u64,
    mut rx: mpsc::UnboundedReceiver<Queued<T>>,
) {
    while let Some(Queued { job, reply }) = rx.recv().await {
        let result = match tokio::spawn(job).await {
            Ok(value) => Ok(value),
            Err(e) => {
                let reason = if e.is_panic() {
                    "job panicked".to_string()
                } else {
                    e.to_string()
                };
                tracing::error!(key = %key, %reason, "job aborted");
                Err(SerializerError::Aborted {
                    key: key.clone(),
                    reason,
                })
            }
        };
        let _ = reply.send(result);

        if !settle(&inner, &key, generation) {
            return;
        }
    }
}

/// Record one settled job. Returns false once the chain is drained and evicted.
fn settle<T>(inner: &Mutex<Chains<T>>, key: &str, generation: u64) -> bool {
    let mut chains = inner.lock().unwrap_or_else(|e| e.into_inner());
    let Some(chain) = chains.chains.get_mut(key) else {
        return false;
    };
    if chain.generation != generation {
        return false;
    }
    chain.outstanding = chain.outstanding.saturating_sub(1);
    if chain.outstanding == 0 {
        chains.chains.remove(key);
        return false;
    }
    true
}

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;
