use std::fmt;
use std::time::Duration;

#[must_use]
pub fn tracing_err<'a, E: std::error::Error + 'static>(err: &'a E) -> impl tracing::Value + 'a {
    err as &dyn std::error::Error
}

pub(crate) fn tracing_duration(duration: Duration) -> impl tracing::Value {
    tracing::field::display(TracingDuration(duration))
}

/// Webhook URLs end with the secret token of the webhook, so it's replaced
/// with a placeholder before the URL gets into the logs.
pub(crate) fn tracing_webhook(url: &url::Url) -> impl tracing::Value {
    tracing::field::display(redact_webhook(url))
}

fn redact_webhook(url: &url::Url) -> url::Url {
    let mut url = url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop().push("***");
    }
    url
}

struct TracingDuration(Duration);

impl fmt::Display for TracingDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2?}", self.0)
    }
}
