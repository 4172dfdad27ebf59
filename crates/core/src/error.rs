// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider error taxonomy and retry classification

use std::fmt;
use thiserror::Error;

/// Low-level reason attached to a network failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkReason {
    HostUnreachable,
    ConnectionRefused,
    Other(String),
}

impl fmt::Display for NetworkReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkReason::HostUnreachable => write!(f, "host unreachable"),
            NetworkReason::ConnectionRefused => write!(f, "connection refused"),
            NetworkReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// Errors reported by a provider API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("network error: {reason}")]
    Network { reason: NetworkReason },
    /// A conflicting operation on the same name is still settling
    /// (e.g. creating a bucket right after deleting it)
    #[error("operation aborted: {0}")]
    OperationAborted(String),
    #[error("already exists: {name} (owned: {owned})")]
    AlreadyExists { name: String, owned: bool },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("immutable field {field} cannot change from {current:?} to {desired:?}")]
    ImmutableField {
        field: String,
        current: String,
        desired: String,
    },
    #[error("rejected by provider ({code}): {message}")]
    Rejected { code: String, message: String },
}

impl ProviderError {
    pub fn network(reason: NetworkReason) -> Self {
        ProviderError::Network { reason }
    }
}

/// Why an error is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Provider temporarily unreachable
    Network,
    /// A racing operation on the same name has not settled yet
    OperationConflict,
}

/// Classifies errors for the retry executor.
///
/// `None` means the error is final and must be propagated without delay.
pub trait Classify {
    fn retry_class(&self) -> Option<RetryClass>;

    /// Final errors that callers handle as part of normal convergence
    fn is_expected(&self) -> bool {
        false
    }
}

impl Classify for ProviderError {
    fn retry_class(&self) -> Option<RetryClass> {
        match self {
            ProviderError::Network {
                reason: NetworkReason::HostUnreachable | NetworkReason::ConnectionRefused,
            } => Some(RetryClass::Network),
            ProviderError::OperationAborted(_) => Some(RetryClass::OperationConflict),
            _ => None,
        }
    }

    fn is_expected(&self) -> bool {
        matches!(
            self,
            ProviderError::NotFound(_) | ProviderError::AlreadyExists { owned: true, .. }
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
