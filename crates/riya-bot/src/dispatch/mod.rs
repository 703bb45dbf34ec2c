//! Bulk processing of the form submissions. Every (server, entry) pair is
//! processed sequentially with a fixed delay between the posts.

mod channel;

use crate::catalog::{ServerCatalog, ServerConfig};
use crate::media::{Compositor, ImagePool};
use crate::observability::metrics;
use crate::parse::{self, BulkItem};
use crate::prelude::*;
use crate::publish::{premium_text, Captions, DiscordPost, Publisher, TelegramPost};
use crate::scrape::Scraper;
use crate::shorten::{AdType, ShortenMode, Shortener};
use futures::prelude::*;
use serde::Deserialize;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use channel::clean_title;

pub(crate) use channel::Channel;

/// Providers are always applied in this order regardless of the order in
/// the request.
const AD_TYPES_ORDER: [AdType; 2] = [AdType::Admaven, AdType::Linkvertise];

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    /// Delay between the posts to avoid hitting the rate limits
    #[serde(default = "default_post_delay_ms")]
    pub(crate) post_delay_ms: u64,
}

fn default_post_delay_ms() -> u64 {
    1500
}

/// Validated form submission
#[derive(Debug)]
pub(crate) struct BulkRequest {
    /// Server ID or [`crate::catalog::ALL_SERVERS`]
    pub(crate) server: String,
    pub(crate) channel: Channel,
    pub(crate) bulk_text: String,
    pub(crate) mode: ShortenMode,
    pub(crate) ad_types: Vec<AdType>,
    pub(crate) label: Option<String>,

    /// Uploaded image. It is removed once the batch is processed.
    pub(crate) upload: Option<PathBuf>,
}

pub(crate) struct Dispatcher {
    catalog: ServerCatalog,
    scraper: Scraper,
    shortener: Shortener,
    compositor: Compositor,
    pool: ImagePool,
    publisher: Arc<dyn Publisher>,
    post_delay: Duration,
}

pub(crate) struct DispatcherParts {
    pub(crate) catalog: ServerCatalog,
    pub(crate) scraper: Scraper,
    pub(crate) shortener: Shortener,
    pub(crate) compositor: Compositor,
    pub(crate) pool: ImagePool,
    pub(crate) publisher: Arc<dyn Publisher>,
    pub(crate) config: Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Published,
    ServerSkipped,
    ScrapeFailed,
}

impl EntryOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::ServerSkipped => "server_skipped",
            Self::ScrapeFailed => "scrape_failed",
        }
    }
}

impl Dispatcher {
    pub(crate) fn new(parts: DispatcherParts) -> Self {
        Self {
            catalog: parts.catalog,
            scraper: parts.scraper,
            shortener: parts.shortener,
            compositor: parts.compositor,
            pool: parts.pool,
            publisher: parts.publisher,
            post_delay: Duration::from_millis(parts.config.post_delay_ms),
        }
    }

    pub(crate) fn catalog(&self) -> &ServerCatalog {
        &self.catalog
    }

    /// Processes the request in a detached task. Panics in the task are
    /// caught and logged, so they don't take the server down.
    pub(crate) fn spawn_batch(self: Arc<Self>, request: BulkRequest) {
        let span = info_span!(
            "bulk",
            id = %nanoid::nanoid!(6),
            server = %request.server,
            channel = request.channel.name(),
        );

        let fut = async move {
            let result = AssertUnwindSafe(self.run(&request)).catch_unwind().await;

            if result.is_err() {
                error!("Bulk processing panicked");
            }

            if let Some(upload) = &request.upload {
                if let Err(err) = fs_err::tokio::remove_file(upload).await {
                    warn!(err = tracing_err(&err), "Failed to remove the uploaded image");
                }
            }
        };

        tokio::spawn(fut.instrument(span));
    }

    pub(crate) async fn run(&self, request: &BulkRequest) {
        let items = parse::parse(&request.bulk_text, request.channel.parse_mode());
        let servers = self.catalog.select(&request.server);

        info!(
            entries = items.len(),
            servers = servers.len(),
            "Starting bulk processing"
        );

        for server_id in &servers {
            for item in &items {
                let outcome = self.process_item(request, server_id, item).await;

                metrics::record_bulk_entry(outcome.as_str());

                if outcome != EntryOutcome::ScrapeFailed {
                    tokio::time::sleep(self.post_delay).await;
                }
            }
        }

        info!("Bulk processing complete");
    }

    #[instrument(skip(self, request, item))]
    async fn process_item(
        &self,
        request: &BulkRequest,
        server_id: &str,
        item: &BulkItem,
    ) -> EntryOutcome {
        let channel = &request.channel;

        let (image, label) = match (&request.upload, channel.requires_upload()) {
            (Some(upload), true) => (upload.clone(), None),
            (None, true) => {
                warn!("Channel requires an uploaded image, but there is none");
                return EntryOutcome::ServerSkipped;
            }
            (_, false) => (self.pool.pick().await, request.label.as_deref()),
        };

        let entry = match item {
            BulkItem::Entry(entry) => entry.clone(),
            BulkItem::ScrapeSource(url) => match self.scraper.scrape(url).await {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(err = tracing_err(&err), url, "Skipping entry that failed to scrape");
                    return EntryOutcome::ScrapeFailed;
                }
            },
        };

        let title = channel.title(&entry, request.label.as_deref());

        let Some(server) = self.catalog.get(server_id).filter(|server| server.active) else {
            debug!("Skipping inactive or unknown server");
            return EntryOutcome::ServerSkipped;
        };

        let post = Post {
            server,
            channel,
            title: clean_title(&title),
            link: &entry.link,
            image: &image,
            label,
        };

        self.publish(request, post).await;

        EntryOutcome::Published
    }

    async fn publish(&self, request: &BulkRequest, post: Post<'_>) {
        let server = post.server;

        let mut links = vec![];

        let effective = server.effective_ad_types(&request.ad_types);
        for ad_type in AD_TYPES_ORDER.into_iter().filter(|ad_type| effective.contains(ad_type)) {
            let link = self
                .shortener
                .shorten(ad_type, post.link, server, request.mode)
                .await
                .into_inner();

            links.push((ad_type, link));
        }

        let captions = Captions::build(&post.title, &links);

        let image = if post.channel.skips_composition() {
            post.image.to_owned()
        } else {
            let watermark = self.compositor.watermark_path(&server.name);
            self.compositor
                .compose(post.image, &watermark, &server.name, post.label)
                .await
                .into_inner()
        };

        let channel = post.channel.name();

        if let Some(webhook) = server.discord_webhook(channel) {
            let premium = premium_text(&post.title, post.link);
            let primary = (webhook, server.discord_premium_webhook.as_ref());
            let supplementary = server
                .supplementary_webhooks
                .iter()
                .map(|hooks| (&hooks.webhook, hooks.premium_webhook.as_ref()));

            for (webhook, premium_webhook) in std::iter::once(primary).chain(supplementary) {
                // The premium variant goes out only together with the main post
                if !self.post_to_discord(webhook, &captions.discord, &image).await {
                    continue;
                }

                if let Some(premium_webhook) = premium_webhook {
                    self.post_to_discord(premium_webhook, &premium, &image).await;
                }
            }
        }

        if let Some((chat, topic)) = server.telegram_destination(channel) {
            let post = TelegramPost {
                chat,
                topic,
                caption: &captions.telegram,
                image: &image,
            };

            if let Err(err) = self.publisher.post_to_telegram(post).await {
                warn!(err = tracing_err(&err), "Failed to post to Telegram");
            }
        }
    }

    /// Returns `false` if the post failed
    async fn post_to_discord(&self, webhook: &url::Url, content: &str, image: &Path) -> bool {
        let post = DiscordPost {
            webhook,
            content,
            image,
        };

        match self.publisher.post_to_discord(post).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    err = tracing_err(&err),
                    webhook = tracing_webhook(webhook),
                    "Failed to post to Discord"
                );
                false
            }
        }
    }
}

struct Post<'a> {
    server: &'a ServerConfig,
    channel: &'a Channel,
    title: String,
    link: &'a str,
    image: &'a Path,
    label: Option<&'a str>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{http, media, Result};
    use async_trait::async_trait;
    use expect_test::expect;
    use serde_json::json;
    use std::sync::Mutex;

    pub(crate) const CATALOG: &str = r#"{
        "alpha": {
            "name": "alpha",
            "Status": true,
            "DiscordChannels": {
                "TeraBox": "https://discord.example/alpha",
                "Leaks-Vids": "https://discord.example/alpha-leaks"
            },
            "Telegram": false,
            "TelegramTopics": { "TeraBox": 3 }
        },
        "beta": {
            "name": "beta",
            "Status": false,
            "DiscordChannels": { "TeraBox": "https://discord.example/beta" }
        },
        "gamma": {
            "name": "gamma",
            "Status": true,
            "DiscordChannels": { "TeraBox": "https://discord.example/gamma" },
            "DiscordPremiumWebhook": "https://discord.example/gamma-premium",
            "SupplementaryWebhooks": [
                {
                    "webhook": "https://discord.example/extra",
                    "premiumWebhook": "https://discord.example/extra-premium"
                }
            ],
            "Telegram": true,
            "Group": "@gamma_channel",
            "TelegramTopics": { "TeraBox": 7 }
        }
    }"#;

    #[derive(Default)]
    pub(crate) struct FakePublisher {
        calls: Mutex<Vec<String>>,
        broken_webhooks: Vec<String>,
    }

    impl FakePublisher {
        fn with_broken_webhooks(webhooks: &[&str]) -> Self {
            Self {
                broken_webhooks: webhooks.iter().map(|&hook| hook.to_owned()).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, platform: &str) -> usize {
            self.calls()
                .iter()
                .filter(|call| call.starts_with(platform))
                .count()
        }
    }

    fn first_line(text: &str) -> &str {
        text.lines().next().unwrap_or_default()
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn post_to_discord(&self, post: DiscordPost<'_>) -> Result {
            if self.broken_webhooks.iter().any(|hook| hook == post.webhook.as_str()) {
                return Err(crate::fatal!("webhook {} is broken", post.webhook));
            }

            let file_name = post.image.file_name().unwrap().to_string_lossy();
            self.calls.lock().unwrap().push(format!(
                "discord {} | {} | {file_name}",
                post.webhook,
                first_line(post.content),
            ));
            Ok(())
        }

        async fn post_to_telegram(&self, post: TelegramPost<'_>) -> Result {
            self.calls.lock().unwrap().push(format!(
                "telegram {:?} #{} | {}",
                post.chat,
                post.topic,
                first_line(post.caption),
            ));
            Ok(())
        }
    }

    pub(crate) fn dispatcher(
        dir: &Path,
        catalog: &str,
        publisher: Arc<FakePublisher>,
    ) -> Dispatcher {
        let assets: media::Config = serde_json::from_value(json!({
            "pool_dir": dir.join("pool"),
            "placeholder": dir.join("placeholder.png"),
            "overlays_dir": dir.join("images"),
            "uploads_dir": dir,
        }))
        .unwrap();

        let http = http::create_client();

        Dispatcher::new(DispatcherParts {
            catalog: ServerCatalog::from_json(catalog).unwrap(),
            scraper: Scraper::new(http.clone()),
            shortener: Shortener::new(serde_json::from_str("{}").unwrap(), http),
            compositor: Compositor::new(&assets),
            pool: ImagePool::new(&assets),
            publisher,
            config: Config { post_delay_ms: 0 },
        })
    }

    fn request(
        server: &str,
        channel: &str,
        bulk_text: &str,
        upload: Option<PathBuf>,
    ) -> BulkRequest {
        BulkRequest {
            server: server.to_owned(),
            channel: Channel::from_name(channel),
            bulk_text: bulk_text.to_owned(),
            mode: ShortenMode::Single,
            ad_types: vec![],
            label: None,
            upload,
        }
    }

    fn upload(dir: &Path) -> PathBuf {
        let path = dir.join("V1StGXR8_Z");
        std::fs::write(&path, "not really an image").unwrap();
        path
    }

    #[test_log::test(tokio::test)]
    async fn telegram_disabled_server_gets_only_discord_posts() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(FakePublisher::default());
        let dispatcher = dispatcher(dir.path(), crate::catalog::tests::SAMPLE, publisher.clone());

        let text = "First clip\nhttps://files.example/1\nSecond clip\nhttps://files.example/2";
        let request = request("alpha", "TeraBox", text, Some(upload(dir.path())));

        dispatcher.run(&request).await;

        assert_eq!(publisher.count("discord"), 2);
        assert_eq!(publisher.count("telegram"), 0);
    }

    #[test_log::test(tokio::test)]
    async fn all_servers_with_premium_and_supplementary_webhooks() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(FakePublisher::default());
        let dispatcher = dispatcher(dir.path(), CATALOG, publisher.clone());

        let text = "NAME: My clip\nLINK: https://files.example/1";
        let request = request("All", "TeraBox", text, Some(upload(dir.path())));

        dispatcher.run(&request).await;

        expect![[r#"
            [
                "discord https://discord.example/alpha | **MY CLIP** | V1StGXR8_Z",
                "discord https://discord.example/gamma | **MY CLIP** | V1StGXR8_Z",
                "discord https://discord.example/gamma-premium | **MY CLIP** | V1StGXR8_Z",
                "discord https://discord.example/extra | **MY CLIP** | V1StGXR8_Z",
                "discord https://discord.example/extra-premium | **MY CLIP** | V1StGXR8_Z",
                "telegram Username(\"@gamma_channel\") #7 | *MY CLIP*",
            ]
        "#]]
        .assert_debug_eq(&publisher.calls());
    }

    #[test_log::test(tokio::test)]
    async fn premium_post_is_skipped_when_main_post_fails() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(FakePublisher::with_broken_webhooks(&[
            "https://discord.example/gamma",
        ]));
        let dispatcher = dispatcher(dir.path(), CATALOG, publisher.clone());

        let text = "NAME: My clip\nLINK: https://files.example/1";
        let request = request("gamma", "TeraBox", text, Some(upload(dir.path())));

        dispatcher.run(&request).await;

        expect![[r#"
            [
                "discord https://discord.example/extra | **MY CLIP** | V1StGXR8_Z",
                "discord https://discord.example/extra-premium | **MY CLIP** | V1StGXR8_Z",
                "telegram Username(\"@gamma_channel\") #7 | *MY CLIP*",
            ]
        "#]]
        .assert_debug_eq(&publisher.calls());
    }

    #[test_log::test(tokio::test)]
    async fn stock_image_channel_uses_label_as_title() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(FakePublisher::default());
        let dispatcher = dispatcher(dir.path(), CATALOG, publisher.clone());

        let mut request = request("alpha", "Leaks-Vids", "https://files.example/1", None);
        request.label = Some("hot-new-leak".to_owned());

        dispatcher.run(&request).await;

        expect![[r#"
            [
                "discord https://discord.example/alpha-leaks | **HOT NEW LEAK** | placeholder.png",
            ]
        "#]]
        .assert_debug_eq(&publisher.calls());
    }

    #[test_log::test(tokio::test)]
    async fn batch_removes_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Arc::new(FakePublisher::default());
        let dispatcher = Arc::new(dispatcher(dir.path(), CATALOG, publisher.clone()));

        let upload = upload(dir.path());
        let text = "My clip\nhttps://files.example/1";

        dispatcher.spawn_batch(request("alpha", "Collection", text, Some(upload.clone())));

        tokio::time::timeout(Duration::from_secs(10), async {
            while upload.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // Collection has no webhook in alpha
        assert_eq!(publisher.calls(), Vec::<String>::new());
    }
}
