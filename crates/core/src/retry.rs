// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transient-error retry executor
//!
//! Every provider call goes through [`RetryExecutor::execute`]. Errors in a
//! recognized retry class are retried forever after a fixed delay; anything
//! else is returned to the caller on the first failure.

use crate::error::{Classify, RetryClass};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Fixed delays applied per retry class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay after a host-unreachable or connection-refused failure
    #[serde(with = "humantime_serde")]
    pub network_delay: Duration,
    /// Delay after a conflicting operation on the same name
    #[serde(with = "humantime_serde")]
    pub conflict_delay: Duration,
}

impl RetryPolicy {
    pub fn new(network_delay: Duration, conflict_delay: Duration) -> Self {
        Self {
            network_delay,
            conflict_delay,
        }
    }

    pub fn delay_for(&self, class: RetryClass) -> Duration {
        match class {
            RetryClass::Network => self.network_delay,
            RetryClass::OperationConflict => self.conflict_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            network_delay: Duration::from_secs(30),
            conflict_delay: Duration::from_secs(5),
        }
    }
}

/// Runs operations, retrying transient failures without limit
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds or fails with a non-retryable error.
    ///
    /// `operation` is invoked once per attempt so each retry starts from scratch.
    /// `label` only appears in logs.
    pub async fn execute<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut attempt: u32 = 1;
        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let Some(class) = error.retry_class() else {
                if error.is_expected() {
                    tracing::debug!(label, attempt, error = %error, "returned expected condition");
                } else {
                    tracing::error!(label, attempt, error = %error, "failed");
                }
                return Err(error);
            };

            let delay = self.policy.delay_for(class);
            tracing::warn!(
                label,
                attempt,
                class = ?class,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
