//! AdMaven content locker API.

use super::paste::PasteHost;
use super::{ShortenError, ShortenMode};
use crate::catalog::AdLockCredentials;
use crate::prelude::*;
use crate::util::url::join_segments;
use crate::{err, http, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Service that hides a URL behind an ad page.
#[async_trait]
pub(crate) trait ContentLocker: Send + Sync {
    /// Returns the short code of the locked link. It must be prefixed with
    /// the domain configured for the server to become a full URL.
    async fn lock(&self, token: &str, title: &str, url: &str) -> Result<String>;
}

pub(crate) struct AdMavenClient {
    http: http::Client,
    api_url: url::Url,
}

impl AdMavenClient {
    pub(crate) fn new(http: http::Client, api_url: url::Url) -> Self {
        Self { http, api_url }
    }
}

#[async_trait]
impl ContentLocker for AdMavenClient {
    async fn lock(&self, token: &str, title: &str, url: &str) -> Result<String> {
        let endpoint = join_segments(&self.api_url, ["api", "public", "content_locker"]);

        let body = self
            .http
            .get(endpoint)
            .query(&[("api_token", token), ("title", title), ("url", url)])
            .read_text()
            .await?;

        parse_locker_response(&body)
    }
}

#[derive(Deserialize)]
struct LockerResponse {
    #[serde(rename = "type")]
    kind: String,

    // It's an array on success, but may be an error string otherwise
    #[serde(default)]
    message: serde_json::Value,
}

#[derive(Deserialize)]
struct LockedLink {
    short: String,
}

/// The API responds with `{"type": "fetched", "message": [{"short": "..."}]}`
/// on success. Anything else is considered a failure.
pub(crate) fn parse_locker_response(body: &str) -> Result<String> {
    let response: LockerResponse = serde_json::from_str(body).map_err(|source| {
        err!(ShortenError::MalformedResponse {
            body: body.to_owned(),
            source,
        })
    })?;

    if response.kind != "fetched" {
        return Err(err!(ShortenError::NotFetched {
            kind: response.kind,
            message: response.message.to_string(),
        }));
    }

    let links: Vec<LockedLink> = serde_json::from_value(response.message).unwrap_or_default();

    links
        .into_iter()
        .next()
        .map(|link| link.short)
        .filter(|short| !short.is_empty())
        .ok_or_else(|| err!(ShortenError::EmptyMessage))
}

/// Locks the link once in the single mode. In the double mode the first
/// locked link is put into a paste, the paste itself is locked, and the
/// paste is protected from bypassing the second lock.
pub(super) async fn lock_link(
    locker: &dyn ContentLocker,
    paste: &dyn PasteHost,
    creds: &AdLockCredentials,
    template: &str,
    link: &str,
    mode: ShortenMode,
) -> Result<String> {
    let title = match mode {
        ShortenMode::Single => "1 of 1",
        ShortenMode::Double => "2 of 2",
    };

    let short = locker.lock(&creds.admaven_token, title, link).await?;
    let locked = format!("{}{short}", creds.admaven_domain);

    if mode == ShortenMode::Single {
        return Ok(locked);
    }

    let paste_id = paste.create_paste(&super::render_template(template, &locked)).await?;
    let paste_url = paste.page_url(&paste_id);

    let short = locker.lock(&creds.admaven_token, "1 of 2", &paste_url).await?;
    let locked = format!("{}{short}", creds.admaven_domain);

    super::protect_paste(paste, &paste_id, &locked).await;

    Ok(locked)
}
