// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::{NetworkReason, ProviderError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

/// Operation that replays a scripted sequence of results and counts attempts
#[derive(Clone)]
struct Scripted {
    results: Arc<Mutex<VecDeque<Result<&'static str, ProviderError>>>>,
    attempts: Arc<Mutex<u32>>,
}

impl Scripted {
    fn new(results: Vec<Result<&'static str, ProviderError>>) -> Self {
        Self {
            results: Arc::new(Mutex::new(results.into())),
            attempts: Arc::new(Mutex::new(0)),
        }
    }

    fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }

    async fn call(&self) -> Result<&'static str, ProviderError> {
        *self.attempts.lock().unwrap() += 1;
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok("done"))
    }
}

fn refused() -> ProviderError {
    ProviderError::network(NetworkReason::ConnectionRefused)
}

fn executor() -> RetryExecutor {
    RetryExecutor::new(RetryPolicy::new(
        Duration::from_secs(30),
        Duration::from_secs(5),
    ))
}

#[tokio::test(start_paused = true)]
async fn success_returns_immediately() {
    let op = Scripted::new(vec![Ok("first")]);
    let start = Instant::now();

    let result = executor().execute("test", || op.call()).await;

    assert_eq!(result, Ok("first"));
    assert_eq!(op.attempts(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_with_fixed_delay() {
    for failures in [1u32, 3, 10] {
        let mut script: Vec<_> = (0..failures).map(|_| Err(refused())).collect();
        script.push(Ok("converged"));
        let op = Scripted::new(script);
        let start = Instant::now();

        let result = executor().execute("test", || op.call()).await;

        assert_eq!(result, Ok("converged"));
        assert_eq!(op.attempts(), failures + 1);
        assert_eq!(start.elapsed(), Duration::from_secs(30) * failures);
    }
}

#[tokio::test(start_paused = true)]
async fn host_unreachable_is_retried() {
    let op = Scripted::new(vec![
        Err(ProviderError::network(NetworkReason::HostUnreachable)),
        Ok("back"),
    ]);

    let result = executor().execute("test", || op.call()).await;

    assert_eq!(result, Ok("back"));
    assert_eq!(op.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn non_transient_error_fails_once_without_delay() {
    let op = Scripted::new(vec![Err(ProviderError::Rejected {
        code: "AccessDenied".into(),
        message: "denied".into(),
    })]);
    let start = Instant::now();

    let result = executor().execute("test", || op.call()).await;

    assert!(matches!(result, Err(ProviderError::Rejected { .. })));
    assert_eq!(op.attempts(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn other_network_reasons_are_not_retried() {
    let op = Scripted::new(vec![Err(ProviderError::network(NetworkReason::Other(
        "reset by peer".into(),
    )))]);

    let result = executor().execute("test", || op.call()).await;

    assert!(result.is_err());
    assert_eq!(op.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn operation_conflict_uses_shorter_delay() {
    let op = Scripted::new(vec![
        Err(ProviderError::OperationAborted("bucket".into())),
        Err(ProviderError::OperationAborted("bucket".into())),
        Ok("created"),
    ]);
    let start = Instant::now();

    let result = executor().execute("test", || op.call()).await;

    assert_eq!(result, Ok("created"));
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn final_error_after_retries_is_propagated() {
    let op = Scripted::new(vec![Err(refused()), Err(ProviderError::NotFound("q".into()))]);

    let result = executor().execute("test", || op.call()).await;

    assert_eq!(result, Err(ProviderError::NotFound("q".into())));
    assert_eq!(op.attempts(), 2);
}

#[test]
fn default_policy_matches_reference_delays() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.network_delay, Duration::from_secs(30));
    assert!(policy.conflict_delay < policy.network_delay);
}

#[test]
fn policy_deserializes_humantime() {
    let policy: RetryPolicy =
        serde_json::from_str(r#"{"network_delay": "2m", "conflict_delay": "500ms"}"#).unwrap();
    assert_eq!(policy.network_delay, Duration::from_secs(120));
    assert_eq!(policy.conflict_delay, Duration::from_millis(500));
}

#[test]
fn policy_fills_missing_fields_with_defaults() {
    let policy: RetryPolicy = serde_json::from_str(r#"{"network_delay": "1s"}"#).unwrap();
    assert_eq!(policy.network_delay, Duration::from_secs(1));
    assert_eq!(policy.conflict_delay, RetryPolicy::default().conflict_delay);
}

// =============================================================================
// Log severity
// =============================================================================

#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.logs.lock().unwrap()).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn retries_and_terminal_failures_log_at_different_levels() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let op = Scripted::new(vec![
        Err(refused()),
        Err(ProviderError::Rejected {
            code: "Invalid".into(),
            message: "bad policy".into(),
        }),
    ]);

    tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap()
            .block_on(async {
                let _ = executor().execute("queue.update", || op.call()).await;
            })
    });

    let output = logs.contents();
    let retry_line = output
        .lines()
        .find(|l| l.contains("transient failure, retrying"))
        .unwrap();
    assert!(retry_line.contains("WARN"));
    assert!(retry_line.contains("queue.update"));

    let failed_line = output.lines().find(|l| l.contains("failed")).unwrap();
    assert!(failed_line.contains("ERROR"));
}
