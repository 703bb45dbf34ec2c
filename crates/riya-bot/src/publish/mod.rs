//! Posting the composed entries to the chat platforms.
mod caption;
mod discord;
mod telegram;

use crate::catalog::TelegramChat;
use crate::observability::metrics;
use crate::prelude::*;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

pub(crate) use caption::{premium_text, Captions};
use discord::DiscordClient;
use telegram::TelegramClient;

#[derive(Debug, Deserialize)]
pub(crate) struct DiscordConfig {
    /// Name of the webhook author shown in Discord
    #[serde(default = "default_discord_username")]
    pub(crate) username: String,

    #[serde(default = "default_discord_avatar_url")]
    pub(crate) avatar_url: String,
}

fn default_discord_username() -> String {
    "R.I.Y.A".to_owned()
}

fn default_discord_avatar_url() -> String {
    "https://i.ibb.co.com/2dzvc4R/2b1c18c5f5dc5ad00472383b1ee2504d.jpg".to_owned()
}

#[derive(Debug, Deserialize)]
pub(crate) struct TelegramConfig {
    /// Telegram publishing is disabled if there is no token
    pub(crate) token: Option<String>,
}

/// A single Discord webhook execution
pub(crate) struct DiscordPost<'a> {
    pub(crate) webhook: &'a url::Url,
    pub(crate) content: &'a str,
    pub(crate) image: &'a Path,
}

/// A photo message in a forum topic of a Telegram chat
pub(crate) struct TelegramPost<'a> {
    pub(crate) chat: &'a TelegramChat,
    pub(crate) topic: i32,
    pub(crate) caption: &'a str,
    pub(crate) image: &'a Path,
}

#[async_trait]
pub(crate) trait Publisher: Send + Sync {
    async fn post_to_discord(&self, post: DiscordPost<'_>) -> Result;

    async fn post_to_telegram(&self, post: TelegramPost<'_>) -> Result;
}

/// Publishes to the real platforms
pub(crate) struct ChatPublisher {
    discord: DiscordClient,
    telegram: Option<TelegramClient>,
}

impl ChatPublisher {
    pub(crate) fn new(discord: DiscordConfig, tg: TelegramConfig) -> Self {
        let http = crate::http::create_plain_client();

        let telegram = tg
            .token
            .map(|token| TelegramClient::new(token, http.clone()));

        if telegram.is_none() {
            warn!("Telegram bot token is not configured, Telegram publishing is disabled");
        }

        Self {
            discord: DiscordClient::new(discord, http),
            telegram,
        }
    }
}

#[async_trait]
impl Publisher for ChatPublisher {
    async fn post_to_discord(&self, post: DiscordPost<'_>) -> Result {
        let result = self.discord.execute_webhook(post).await;
        metrics::record_post("discord", outcome(&result));
        result
    }

    async fn post_to_telegram(&self, post: TelegramPost<'_>) -> Result {
        let Some(telegram) = &self.telegram else {
            debug!("Skipping Telegram post, because the bot token is not configured");
            return Ok(());
        };

        let result = telegram.send_photo(post).await;
        metrics::record_post("telegram", outcome(&result));
        result
    }
}

fn outcome(result: &Result) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(_) => "err",
    }
}
