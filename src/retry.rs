//! Retry helper for single-shot service calls

use crate::ClientError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Execute an async operation with retry logic.
///
/// The provided closure is executed up to `retries + 1` times, waiting a
/// linearly increasing delay between attempts. Only transient errors
/// ([`ClientError::is_transient`]) are retried; anything else is returned
/// immediately.
pub async fn execute_with_retry<F, Fut, T>(retries: u32, mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        debug!(attempt, max = retries + 1, "request attempt");

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt <= retries && err.is_transient() => {
                let delay = Duration::from_millis(1000 * attempt as u64);
                warn!(
                    "request failed (attempt {}), retrying in {:?}: {}",
                    attempt, delay, err
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn scripted(
        responses: Vec<Result<&'static str, ClientError>>,
    ) -> Arc<Mutex<VecDeque<Result<&'static str, ClientError>>>> {
        Arc::new(Mutex::new(VecDeque::from(responses)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_retried() {
        let responses = scripted(vec![
            Err(ClientError::timeout("first attempt timed out")),
            Ok("recovered"),
        ]);

        let result = execute_with_retry(2, || {
            let responses = responses.clone();
            async move { responses.lock().unwrap().pop_front().unwrap() }
        })
        .await;

        assert_eq!(result.unwrap(), "recovered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_is_not_retried() {
        let responses = scripted(vec![
            Err(ClientError::config("bad endpoint", None)),
            Ok("never reached"),
        ]);

        let result = execute_with_retry(3, || {
            let responses = responses.clone();
            async move { responses.lock().unwrap().pop_front().unwrap() }
        })
        .await;

        assert!(matches!(result, Err(ClientError::Configuration(_))));
        assert_eq!(responses.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhaustion_surfaces_last_error() {
        let responses = scripted(vec![
            Err(ClientError::rate_limit("throttled")),
            Err(ClientError::rate_limit("still throttled")),
        ]);

        let result = execute_with_retry(1, || {
            let responses = responses.clone();
            async move { responses.lock().unwrap().pop_front().unwrap() }
        })
        .await;

        match result {
            Err(ClientError::Api(err)) => assert_eq!(err.message, "still throttled"),
            other => panic!("expected rate limit error, got {:?}", other),
        }
    }
}
