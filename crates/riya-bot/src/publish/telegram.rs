use super::TelegramPost;
use crate::prelude::*;
use crate::Result;
use teloxide::adaptors::{DefaultParseMode, Throttle, Trace};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};

type Bot = Trace<DefaultParseMode<Throttle<teloxide::Bot>>>;

pub(crate) struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub(crate) fn new(token: String, http: reqwest::Client) -> Self {
        let bot = teloxide::Bot::with_client(token, http)
            .throttle(Default::default())
            .parse_mode(ParseMode::MarkdownV2)
            .trace(teloxide::adaptors::trace::Settings::all());

        Self { bot }
    }

    /// Caption must already be escaped for MarkdownV2
    #[instrument(skip_all, fields(topic = post.topic, image = %post.image.display()))]
    pub(crate) async fn send_photo(&self, post: TelegramPost<'_>) -> Result {
        let photo = InputFile::file(post.image.to_path_buf());

        self.bot
            .send_photo(post.chat.to_recipient(), photo)
            .caption(post.caption)
            .message_thread_id(post.topic)
            .send()
            .with_duration_log("Sending photo to Telegram")
            .await?;

        Ok(())
    }
}
