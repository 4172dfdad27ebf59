// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch sources: list and watch declared resources of one kind

mod http;

pub use http::{HttpWatchSource, HttpWatchSourceConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWatchSource, SourceCall};

use async_trait::async_trait;
use converge_core::{ResourceKind, ResourceList, ResourceVersion, WatchEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Stream of watch events; the channel closing is the "end" signal
pub type WatchStream<S> = mpsc::Receiver<WatchEvent<S>>;

/// Errors from watch source operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("cannot reach watch source: {0}")]
    Connection(String),
    #[error("watch source returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("cannot decode watch source response: {0}")]
    Decode(String),
}

/// Source of declared resources for one kind
#[async_trait]
pub trait WatchSource: Send + Sync + 'static {
    type Spec: Clone + Send + Sync + 'static;

    fn kind(&self) -> &ResourceKind;

    /// Fetch the full current collection and its version
    async fn list(&self) -> Result<ResourceList<Self::Spec>, SourceError>;

    /// Open a watch starting after `from`
    async fn watch(&self, from: ResourceVersion) -> Result<WatchStream<Self::Spec>, SourceError>;
}
