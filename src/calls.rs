// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-call timeout and fixed-backoff retry for cluster and cloud API calls

use crate::config::Timings;
use crate::error::{Result, TeardownError};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Bounds applied to every individual API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub attempts: u32,
    pub backoff: Duration,
}

impl CallPolicy {
    pub fn from_timings(timings: &Timings) -> Self {
        Self {
            timeout: timings.call_timeout,
            attempts: timings.transient_attempts.max(1),
            backoff: timings.transient_backoff,
        }
    }
}

/// Run `call` under the policy's timeout, retrying transient failures.
///
/// A timeout becomes `TeardownError::Timeout` instead of stalling the caller.
/// Non-transient errors are returned on first occurrence.
pub async fn guarded<T, F, Fut>(policy: &CallPolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        let result = match timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(TeardownError::Timeout {
                operation: operation.to_string(),
                after: policy.timeout,
            }),
        };

        match result {
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                warn!(
                    "{} failed with transient error (attempt {}/{}): {}, retrying in {:?}",
                    operation, attempt, policy.attempts, e, policy.backoff
                );
                sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                debug!("{} failed: {}", operation, e);
                return Err(e);
            }
            Ok(value) => return Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn make_policy(attempts: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(50),
            attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_transient_error_is_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = guarded(&make_policy(3), "list disks", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(TeardownError::Transient("rate limited".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transient_error_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = guarded(&make_policy(3), "list disks", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TeardownError::Transient("503".to_string()))
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_blocking_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = guarded(&make_policy(3), "delete disk", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TeardownError::Blocking("in use".to_string()))
        })
        .await;

        assert!(matches!(result, Err(TeardownError::Blocking(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stuck_call_times_out() {
        let result: Result<()> = guarded(&make_policy(1), "describe cluster", || async {
            sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;

        match result {
            Err(TeardownError::Timeout { operation, after }) => {
                assert_eq!(operation, "describe cluster");
                assert_eq!(after, Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sub_second_timeout_is_reported_precisely() {
        let result: Result<()> = guarded(&make_policy(1), "probe cluster API", || async {
            sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "probe cluster API timed out after 50ms"
        );
    }
}
