use crate::prelude::*;
use crate::util::url::join_segments;
use crate::{http, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Paste hosting service that also provides a URL shortener and "anti-bypass"
/// protection of the pastes.
#[async_trait]
pub(crate) trait PasteHost: Send + Sync {
    /// Creates a paste with the given text and returns its ID
    async fn create_paste(&self, content: &str) -> Result<String>;

    /// Makes the paste redirect to `redirect_url` when someone tries to open
    /// it without passing through the ad-lock.
    async fn set_anti_bypass(&self, paste_id: &str, redirect_url: &str) -> Result;

    /// Returns the short code of the URL. Use [`PasteHost::page_url`] to turn
    /// it into a full link.
    async fn shorten_url(&self, url: &str) -> Result<String>;

    /// Public URL of the paste or of the short link with the given ID
    fn page_url(&self, id: &str) -> String;
}

pub(crate) struct PasteClient {
    http: http::Client,
    base_url: url::Url,
}

impl PasteClient {
    pub(crate) fn new(http: http::Client, base_url: url::Url) -> Self {
        Self { http, base_url }
    }

    fn api_url(&self, segments: &[&str]) -> url::Url {
        join_segments(&self.base_url, ["api"].iter().chain(segments))
    }
}

#[derive(Serialize)]
struct CreatePasteRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct CreatePasteResponse {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AntiBypassRequest<'a> {
    anti_bypass: bool,
    redirect_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShortenRequest<'a> {
    original_url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortenResponse {
    short_url: String,
}

#[async_trait]
impl PasteHost for PasteClient {
    async fn create_paste(&self, content: &str) -> Result<String> {
        let response: CreatePasteResponse = self
            .http
            .post(self.api_url(&["paste"]))
            .send_and_read_json(&CreatePasteRequest { content })
            .await?;

        debug!(paste_id = %response.id, "Created a paste");

        Ok(response.id)
    }

    async fn set_anti_bypass(&self, paste_id: &str, redirect_url: &str) -> Result {
        let request = AntiBypassRequest {
            anti_bypass: true,
            redirect_url,
        };

        self.http
            .post(self.api_url(&["paste", paste_id, "anti-bypass"]))
            .json(&request)
            .try_send()
            .await?;

        Ok(())
    }

    async fn shorten_url(&self, url: &str) -> Result<String> {
        let response: ShortenResponse = self
            .http
            .post(self.api_url(&["shorten"]))
            .send_and_read_json(&ShortenRequest { original_url: url })
            .await?;

        Ok(response.short_url)
    }

    fn page_url(&self, id: &str) -> String {
        join_segments(&self.base_url, [id]).into()
    }
}
