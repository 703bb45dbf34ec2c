use crate::prelude::*;
use crate::util::Degradable;
use crate::Result;
use chrono::prelude::*;
use retry_policies::{RetryDecision, RetryPolicy};
use std::future::Future;
use std::time::Duration;

/// Runs `op` until it succeeds, making at most `max_retries` additional
/// attempts after the first one. If every attempt fails, then the value
/// produced by `fallback` is returned as [`Degradable::Degraded`].
///
/// The closure receives the zero-based number of the attempt.
///
/// The HTTP client already retries transient network failures, while this
/// function is meant for logical failures of the remote API. The attempts are
/// paced with the same exponential backoff as the HTTP client uses.
pub(crate) async fn retry_or_degrade<T, Fut>(
    max_retries: u32,
    fallback: impl FnOnce() -> T,
    mut op: impl FnMut(u32) -> Fut,
) -> Degradable<T>
where
    Fut: Future<Output = Result<T>>,
{
    let policy = crate::http::retry_policy(max_retries);
    let mut attempt = 0;

    loop {
        let err = match op(attempt).await {
            Ok(output) => {
                if attempt > 0 {
                    warn!(%attempt, "Operation succeeded after a retry");
                }
                return Degradable::Ok(output);
            }
            Err(err) => err,
        };

        warn!(
            %attempt,
            %max_retries,
            err = tracing_err(&err),
            "Operation failed"
        );

        let execute_after = match policy.should_retry(attempt) {
            RetryDecision::Retry { execute_after } => execute_after,
            RetryDecision::DoNotRetry => break,
        };

        let duration = execute_after
            .signed_duration_since(Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        debug!(
            %attempt,
            duration = format_args!("{duration:.2?}"),
            "Sleeping before the next attempt",
        );

        tokio::time::sleep(duration).await;

        attempt += 1;
    }

    warn!(%max_retries, "Giving up retrying, falling back to the original value");

    Degradable::Degraded(fallback())
}
