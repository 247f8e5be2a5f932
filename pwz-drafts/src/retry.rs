//! Storage retry logic
//!
//! Exponential backoff for transient storage failures. Only errors that
//! `is_transient` classifies are retried; everything else returns
//! immediately. Each attempt is bounded by a timeout. A timed-out read is
//! retried like any other transient failure; a timed-out write is not, because
//! the abandoned statement may still commit.
//!
//! **Backoff Strategy:**
//! - Initial delay: 10ms
//! - Max delay: 250ms
//! - Multiplier: 2.0

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{DraftError, Result};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 250;

/// Retry budget for one storage operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Bound on each individual attempt
    pub attempt_timeout: Duration,
    /// Total time after which the last transient error is surfaced
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(5000),
            max_wait: Duration::from_millis(1000),
        }
    }
}

/// Whether a database error is worth retrying
pub fn is_transient_db_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            message.contains("database is locked") || message.contains("database is busy")
        }
        _ => false,
    }
}

fn is_transient(err: &DraftError) -> bool {
    match err {
        DraftError::StorageUnavailable(_) => true,
        DraftError::Database(db_err) => is_transient_db_error(db_err),
        _ => false,
    }
}

/// Run `operation` until it succeeds, fails permanently, or the budget runs out
///
/// Exhausting the budget surfaces `StorageUnavailable`.
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    run(operation_name, policy, true, operation).await
}

/// Like [`retry_transient`], for writes that must not be issued twice
///
/// Lock and busy errors mean nothing was written and are retried. A timeout
/// surfaces `StorageUnavailable` at once: the write may have landed after
/// its future was dropped, so the caller must not assume it had no effect.
pub async fn retry_write<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    run(operation_name, policy, false, operation).await
}

async fn run<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    retry_timeouts: bool,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => {
                let err = DraftError::StorageUnavailable(format!(
                    "{} timed out after {} ms",
                    operation_name,
                    policy.attempt_timeout.as_millis()
                ));
                if !retry_timeouts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        "Write timed out; outcome unknown, not retrying"
                    );
                    return Err(err);
                }
                Err(err)
            }
        };

        let err = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Storage operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_transient(&err) {
            return Err(err);
        }

        let elapsed = start_time.elapsed();
        if elapsed >= policy.max_wait {
            tracing::error!(
                operation = operation_name,
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "Storage operation failed: retry budget exhausted"
            );
            return Err(match err {
                DraftError::StorageUnavailable(msg) => DraftError::StorageUnavailable(msg),
                other => DraftError::StorageUnavailable(format!(
                    "{} failed after {} attempts: {}",
                    operation_name, attempt, other
                )),
            });
        }

        tracing::warn!(
            operation = operation_name,
            attempt,
            backoff_ms,
            error = %err,
            "Transient storage failure, will retry after backoff"
        );

        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
    }
}
