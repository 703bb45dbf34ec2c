use super::{DiscordConfig, DiscordPost};
use crate::http::HttpClientError;
use crate::prelude::*;
use crate::{err, err_ctx, Result};
use reqwest::multipart::{Form, Part};
use std::path::Path;

/// Executes Discord webhooks with an image attachment. It uses the client
/// without the retry middleware, because multipart bodies can't be cloned.
pub(crate) struct DiscordClient {
    http: reqwest::Client,
    config: DiscordConfig,
}

impl DiscordClient {
    pub(crate) fn new(config: DiscordConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    #[instrument(skip_all, fields(image = %post.image.display()))]
    pub(crate) async fn execute_webhook(&self, post: DiscordPost<'_>) -> Result {
        let bytes = fs_err::tokio::read(post.image).await?;

        let file = Part::bytes(bytes).file_name(attachment_name(post.image));

        let form = Form::new()
            .text("content", post.content.to_owned())
            .text("username", self.config.username.clone())
            .text("avatar_url", self.config.avatar_url.clone())
            .part("file", file);

        let response = self
            .http
            .post(post.webhook.clone())
            .multipart(form)
            .send()
            .with_duration_log("Executing Discord webhook")
            .await
            .map_err(|source| {
                let source = reqwest_middleware::Error::from(source);
                err!(HttpClientError::Request { source })
            })?;

        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .map_err(reqwest_middleware::Error::from)
            .map_err(err_ctx!(HttpClientError::ReadPayload))?;

        Err(err!(HttpClientError::BadResponseStatusCode { status, body }))
    }
}

/// Uploads are stored without an extension, but Discord needs one to render
/// the attachment as an image.
fn attachment_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());

    if path.extension().is_some() {
        name
    } else {
        format!("{name}.png")
    }
}
