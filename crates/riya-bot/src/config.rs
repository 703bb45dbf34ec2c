use crate::{dispatch, media, publish, server, shorten};
use serde::de::DeserializeOwned;

/// Process-level configuration loaded from the environment. The per-server
/// configuration lives in a separate JSON file, see [`crate::catalog`].
pub struct Config {
    pub(crate) http: server::Config,
    pub(crate) tg: publish::TelegramConfig,
    pub(crate) discord: publish::DiscordConfig,
    pub(crate) assets: media::Config,
    pub(crate) shorten: shorten::Config,
    pub(crate) dispatch: dispatch::Config,
}

impl Config {
    pub fn load_or_panic() -> Config {
        Self {
            http: from_env_or_panic("HTTP_"),
            tg: from_env_or_panic("TG_"),
            discord: from_env_or_panic("DISCORD_"),
            assets: from_env_or_panic("ASSETS_"),
            shorten: from_env_or_panic("SHORTEN_"),
            dispatch: from_env_or_panic("DISPATCH_"),
        }
    }
}

pub(crate) fn from_env_or_panic<T: DeserializeOwned>(prefix: &str) -> T {
    envy::prefixed(prefix).from_env().unwrap_or_else(|err| {
        panic!(
            "BUG: Couldn't load config from environment for {}: {:#?}",
            std::any::type_name::<T>(),
            err
        );
    })
}
