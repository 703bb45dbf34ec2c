mod basic_ext;
mod json_ext;

use crate::observability::metrics;
use crate::prelude::*;
use async_trait::async_trait;
use reqwest_middleware::RequestBuilder;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::time::{Duration, Instant};

pub(crate) mod prelude {
    pub(crate) use super::basic_ext::RequestBuilderBasicExt;
    pub(crate) use super::json_ext::RequestBuilderJsonExt;
}

/// HTTP client with retries of transient failures and logging of every request.
pub type Client = reqwest_middleware::ClientWithMiddleware;

const USER_AGENT: &str = concat!("RiyaBot/", env!("CARGO_PKG_VERSION"));

pub(crate) fn default_retry_policy() -> ExponentialBackoff {
    retry_policy(4)
}

pub(crate) fn retry_policy(max_retries: u32) -> ExponentialBackoff {
    // Retry exponentially increasing intervals between attempts.
    ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(100), Duration::from_secs(2))
        .build_with_max_retries(max_retries)
}

/// Client without middleware. It is required for the requests with streaming
/// or multipart bodies, that can't be cloned, and thus can't be retried.
pub(crate) fn create_plain_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|err| panic!("BUG: failed to build the HTTP client: {err:#?}"))
}

pub(crate) fn create_client() -> Client {
    reqwest_middleware::ClientBuilder::new(create_plain_client())
        .with(OutermostObservingMiddleware)
        .with(RetryTransientMiddleware::new_with_policy(
            default_retry_policy(),
        ))
        .with(InnermostObservingMiddleware)
        .build()
}

struct OutermostObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for OutermostObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut task_local_extensions::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let span = info_span!(
            "request",
            method = %request.method(),
            url = %request.url(),
        );
        next.run(request, extensions).instrument(span).await
    }
}

struct InnermostObservingMiddleware;

#[async_trait]
impl reqwest_middleware::Middleware for InnermostObservingMiddleware {
    async fn handle(
        &self,
        request: reqwest::Request,
        extensions: &mut task_local_extensions::Extensions,
        next: reqwest_middleware::Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        let method = request.method().to_string();
        let host = request.url().host_str().unwrap_or("{unknown}").to_owned();

        let start = Instant::now();
        let result = next.run(request, extensions).await;
        let elapsed = start.elapsed();

        let duration = tracing_duration(elapsed);

        let status = match &result {
            Ok(response) => response.status().to_string(),
            Err(_) => "{fatal}".to_owned(),
        };

        metrics::record_http_request(method, host, status, elapsed);

        let response = match &result {
            Ok(response) => response,
            Err(err) => {
                error!(duration, err = tracing_err(err), "Network request failed");
                return result;
            }
        };

        let status = response.status();

        let Err(err) = response.error_for_status_ref() else {
            info!(duration, %status, "Network request succeeded");
            return result;
        };

        warn!(
            err = tracing_err(&err),
            duration,
            %status,
            "Network request failed (error status)"
        );

        result
    }
}

/// Errors at the layer of the HTTP API
#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpClientError {
    #[error("HTTP request failed")]
    Request { source: reqwest_middleware::Error },

    #[error("Failed to read HTTP response")]
    ReadPayload { source: reqwest_middleware::Error },

    #[error("HTTP request has failed (HTTP status code: {status}):\n{body}")]
    BadResponseStatusCode {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Received an unexpected response JSON object (expected `{expected}`):\n{body}")]
    UnexpectedResponseJsonShape {
        expected: &'static str,
        body: String,
        source: serde_json::Error,
    },
}
