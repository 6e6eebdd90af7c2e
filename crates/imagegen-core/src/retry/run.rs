//! Retry loop: run an async call until success or the policy says stop.

use std::future::Future;
use std::time::Duration;

use super::classify::classify;
use super::error::RetryError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::provider::ProviderError;

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `on_retry(failed_attempt, error, delay)` is called before each pause.
pub async fn run_with_retry<T, F, Fut, R>(
    policy: &RetryPolicy,
    mut on_retry: R,
    mut f: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    R: FnMut(u32, &ProviderError, Duration),
{
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return Err(RetryError {
                            kind,
                            attempts: attempt,
                            last: e,
                        })
                    }
                    RetryDecision::RetryAfter(d) => {
                        on_retry(attempt, &e, d);
                        tokio::time::sleep(d).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}
