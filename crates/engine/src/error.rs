// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the reconciliation engine

use converge_adapters::SourceError;
use converge_core::ResourceKind;
use thiserror::Error;

/// Errors that stop a reconciler from starting
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("initial list of {kind} failed: {source}")]
    InitialList {
        kind: ResourceKind,
        #[source]
        source: SourceError,
    },
}

/// Errors delivered to the caller of one serialized job
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializerError {
    #[error("job for {key} aborted: {reason}")]
    Aborted { key: String, reason: String },
    #[error("serializer is closed")]
    Closed,
}
