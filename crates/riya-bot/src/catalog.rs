//! Static per-server configuration: ad-lock credentials, message templates
//! and the chat destinations of every server (a "brand" we post to).

use crate::prelude::*;
use crate::shorten::AdType;
use crate::{err, Result};
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Special value of the `server` form field that selects every server.
pub(crate) const ALL_SERVERS: &str = "All";

/// Immutable snapshot of all server configurations. It is loaded once at
/// startup and shared read-only between all bulk requests.
#[derive(Debug, Clone, Default)]
pub(crate) struct ServerCatalog {
    servers: Arc<BTreeMap<String, ServerConfig>>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServerConfig {
    /// Display name of the server. It is also the name of the directory
    /// with the watermark and label overlays of this server.
    pub(crate) name: String,

    /// Inactive servers don't receive any posts.
    #[serde(rename = "Status", default)]
    pub(crate) active: bool,

    #[serde(flatten)]
    pub(crate) ad_lock: AdLockCredentials,

    /// Text of the paste page created in the double shortening mode.
    /// The `%shortUrl%` token is replaced with the first locked link.
    #[serde(default)]
    pub(crate) template: String,

    /// Discord webhook URL per channel name. Empty strings mean the channel
    /// isn't configured.
    #[serde_as(as = "HashMap<_, NoneAsEmptyString>")]
    #[serde(rename = "DiscordChannels", default)]
    discord_channels: HashMap<String, Option<url::Url>>,

    /// Webhook that receives a variant of the post with the original link
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(rename = "DiscordPremiumWebhook", default)]
    pub(crate) discord_premium_webhook: Option<url::Url>,

    /// Additional destinations that receive every Discord post of this server
    #[serde(rename = "SupplementaryWebhooks", default)]
    pub(crate) supplementary_webhooks: Vec<SupplementaryWebhook>,

    #[serde(rename = "Telegram", default)]
    pub(crate) telegram_enabled: bool,

    #[serde(rename = "Group", default)]
    pub(crate) telegram_chat: Option<TelegramChat>,

    /// Forum topic (message thread) ID per channel name
    #[serde(rename = "TelegramTopics", default)]
    pub(crate) telegram_topics: HashMap<String, i32>,

    /// If set, these ad types are applied to every post of this server
    /// regardless of the ad types selected in the request.
    #[serde(rename = "ForcedAdTypes", default)]
    pub(crate) forced_ad_types: Option<Vec<AdType>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AdLockCredentials {
    /// AdMaven API token
    #[serde(rename = "token", default)]
    pub(crate) admaven_token: String,

    /// Prefix prepended to the short code returned by AdMaven
    #[serde(rename = "domain", default)]
    pub(crate) admaven_domain: String,

    #[serde(rename = "linkvertiseId", default)]
    pub(crate) linkvertise_id: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SupplementaryWebhook {
    pub(crate) webhook: url::Url,

    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(rename = "premiumWebhook", default)]
    pub(crate) premium_webhook: Option<url::Url>,
}

/// Telegram chat is identified either by its numeric ID or by the public
/// `@username` of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum TelegramChat {
    Id(i64),
    Username(String),
}

impl TelegramChat {
    pub(crate) fn to_recipient(&self) -> teloxide::types::Recipient {
        use teloxide::types::{ChatId, Recipient};

        match self {
            Self::Id(id) => Recipient::Id(ChatId(*id)),
            Self::Username(username) => match username.parse::<i64>() {
                Ok(id) => Recipient::Id(ChatId(id)),
                Err(_) => Recipient::ChannelUsername(username.clone()),
            },
        }
    }
}

impl ServerConfig {
    /// Webhook of the channel in the Discord server if it is configured.
    pub(crate) fn discord_webhook(&self, channel: &str) -> Option<&url::Url> {
        self.discord_channels.get(channel)?.as_ref()
    }

    /// Forum topic of the channel if the server posts to Telegram at all.
    pub(crate) fn telegram_destination(&self, channel: &str) -> Option<(&TelegramChat, i32)> {
        if !self.telegram_enabled {
            return None;
        }
        let chat = self.telegram_chat.as_ref()?;
        let topic = self.telegram_topics.get(channel)?;
        Some((chat, *topic))
    }

    /// Ad types to shorten the link with. The server may override the
    /// selection made in the request.
    pub(crate) fn effective_ad_types<'a>(&'a self, requested: &'a [AdType]) -> &'a [AdType] {
        self.forced_ad_types.as_deref().unwrap_or(requested)
    }
}

impl ServerCatalog {
    pub(crate) fn new(servers: BTreeMap<String, ServerConfig>) -> Self {
        Self {
            servers: Arc::new(servers),
        }
    }

    pub(crate) async fn load(path: &Path) -> Result<Self> {
        let json = fs_err::tokio::read_to_string(path)
            .await
            .map_err(|source| {
                err!(ConfigError::ReadCatalog {
                    path: path.to_owned(),
                    source,
                })
            })?;

        let catalog = Self::from_json(&json)?;

        info!(
            path = %path.display(),
            servers = catalog.servers.len(),
            "Loaded the server catalog"
        );

        Ok(catalog)
    }

    pub(crate) fn from_json(json: &str) -> Result<Self> {
        let servers = serde_json::from_str(json)
            .map_err(|source| err!(ConfigError::ParseCatalog { source }))?;

        Ok(Self::new(servers))
    }

    pub(crate) fn get(&self, id: &str) -> Option<&ServerConfig> {
        self.servers.get(id)
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    /// Resolves the value of the `server` form field into the list of
    /// server IDs to post to.
    pub(crate) fn select(&self, selection: &str) -> Vec<String> {
        if selection == ALL_SERVERS {
            return self.ids().map(ToOwned::to_owned).collect();
        }
        vec![selection.to_owned()]
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("Failed to read the server catalog at {}", path.display())]
    ReadCatalog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("The server catalog is not a valid JSON map of server configs")]
    ParseCatalog { source: serde_json::Error },
}
