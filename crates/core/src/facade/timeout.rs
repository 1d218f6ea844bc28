//! Bounded-time execution of query operations.

use std::future::Future;
use std::time::Duration;
use stratum_api::{ApiError, ApiResult};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

fn timed_out(operation: &str, limit: Duration) -> ApiError {
    ApiError::Timeout {
        operation: operation.to_string(),
        seconds: limit.as_secs(),
    }
}

/// Runs `op` on a fresh named worker thread and waits at most `limit`.
///
/// On expiry the token handed to `op` is cancelled and `Timeout` is returned
/// immediately; the worker is left to observe the token and finish on its own.
/// A panicking worker surfaces as `Internal`.
pub async fn execute_with_timeout<T, F>(operation: &str, limit: Duration, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&CancellationToken) -> ApiResult<T> + Send + 'static,
{
    let token = CancellationToken::new();
    let worker_token = token.clone();
    let (tx, rx) = oneshot::channel();

    std::thread::Builder::new()
        .name(format!("stratum-{}", operation))
        .spawn(move || {
            let result = op(&worker_token);
            // receiver gone means the caller already timed out
            let _ = tx.send(result);
        })
        .map_err(|e| ApiError::Internal(format!("cannot spawn worker for '{}': {}", operation, e)))?;

    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => {
            tracing::error!("Worker for '{}' panicked", operation);
            Err(ApiError::Internal(format!("operation '{}' panicked", operation)))
        }
        Err(_) => {
            token.cancel();
            tracing::warn!("Operation '{}' exceeded {:?}, cancelled", operation, limit);
            Err(timed_out(operation, limit))
        }
    }
}

/// Async counterpart: the future runs as a spawned task that is aborted on expiry.
pub async fn execute_async_with_timeout<T, Fut>(
    operation: &str,
    limit: Duration,
    future: Fut,
) -> ApiResult<T>
where
    T: Send + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
{
    let mut handle = tokio::spawn(future);
    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => {
            tracing::error!("Task for '{}' failed: {}", operation, join);
            Err(ApiError::Internal(format!("operation '{}' failed: {}", operation, join)))
        }
        Err(_) => {
            handle.abort();
            tracing::warn!("Operation '{}' exceeded {:?}, aborted", operation, limit);
            Err(timed_out(operation, limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_returns_result_of_fast_operation() {
        let out = execute_with_timeout("fast", Duration::from_secs(5), |_| Ok(42)).await;
        assert_eq!(out, Ok(42));
    }

    #[tokio::test]
    async fn test_propagates_operation_error() {
        let out: ApiResult<()> = execute_with_timeout("fails", Duration::from_secs(5), |_| {
            Err(ApiError::NotFound("x".into()))
        })
        .await;
        assert_eq!(out, Err(ApiError::NotFound("x".into())));
    }

    #[tokio::test]
    async fn test_slow_operation_times_out_and_is_cancelled() {
        let observed = Arc::new(AtomicBool::new(false));
        let flag = observed.clone();
        let out = execute_with_timeout("slow", Duration::from_millis(100), move |token| {
            for _ in 0..200 {
                if token.is_cancelled() {
                    flag.store(true, Ordering::SeqCst);
                    return Ok(());
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        })
        .await;

        let err = out.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.code(), "TIMEOUT");

        for _ in 0..100 {
            if observed.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panic_becomes_internal() {
        let out: ApiResult<()> =
            execute_with_timeout("boom", Duration::from_secs(5), |_| panic!("boom")).await;
        assert!(matches!(out, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn test_async_operation_times_out() {
        let out: ApiResult<()> = execute_async_with_timeout("sleepy", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(out.unwrap_err().is_timeout());

        let ok = execute_async_with_timeout("quick", Duration::from_secs(5), async { Ok("done") }).await;
        assert_eq!(ok, Ok("done"));
    }
}
