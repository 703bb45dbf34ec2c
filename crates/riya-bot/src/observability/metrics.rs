use super::GLOBAL_LABELS;
use crate::config::from_env_or_panic;
use metrics::{describe_counter, describe_histogram, histogram, increment_counter};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use serde::Deserialize;
use std::time::Duration;

/// Histogram buckets to measure the distribution of request durations in seconds
const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const HTTP_REQUEST_DURATION_SECONDS: &str = "riya_http_request_duration_seconds";
const POSTS_PUBLISHED_TOTAL: &str = "riya_posts_published_total";
const LINKS_SHORTENED_TOTAL: &str = "riya_links_shortened_total";
const BULK_ENTRIES_TOTAL: &str = "riya_bulk_entries_total";

#[derive(Deserialize)]
struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    port: u16,
}

fn default_metrics_port() -> u16 {
    2000
}

pub fn init_metrics() {
    let config: MetricsConfig = from_env_or_panic("METRICS_");

    let mut builder = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.port))
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_owned()),
            DEFAULT_DURATION_BUCKETS,
        )
        .unwrap_or_else(|err| panic!("BUG: empty list of histogram buckets: {err:?}"));

    for (key, value) in GLOBAL_LABELS {
        builder = builder.add_global_label(*key, *value);
    }

    builder
        .install()
        .expect("BUG: failed to initialize the metrics listener");

    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "Duration of a single real http request. If there were retries, then \
        these will appear as separate observations."
    );
    describe_counter!(
        POSTS_PUBLISHED_TOTAL,
        "Number of attempts to publish a post to a chat platform"
    );
    describe_counter!(
        LINKS_SHORTENED_TOTAL,
        "Number of links passed through the ad-lock providers"
    );
    describe_counter!(
        BULK_ENTRIES_TOTAL,
        "Number of (server, entry) pairs processed by the bulk dispatcher"
    );
}

pub(crate) fn record_http_request(
    method: String,
    host: String,
    status: String,
    elapsed: Duration,
) {
    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        elapsed.as_secs_f64(),
        "method" => method,
        "host" => host,
        "status" => status,
    );
}

pub(crate) fn record_post(platform: &'static str, result: &'static str) {
    increment_counter!(POSTS_PUBLISHED_TOTAL, "platform" => platform, "result" => result);
}

pub(crate) fn record_shortened(provider: &'static str, outcome: &'static str) {
    increment_counter!(LINKS_SHORTENED_TOTAL, "provider" => provider, "outcome" => outcome);
}

pub(crate) fn record_bulk_entry(outcome: &'static str) {
    increment_counter!(BULK_ENTRIES_TOTAL, "outcome" => outcome);
}
