//! Monetization of links via the ad-lock providers.
mod admaven;
mod linkvertise;
mod paste;

use crate::catalog::ServerConfig;
use crate::http;
use crate::observability::metrics;
use crate::prelude::*;
use crate::util::retry::retry_or_degrade;
use crate::util::Degradable;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use admaven::{AdMavenClient, ContentLocker};
use paste::{PasteClient, PasteHost};

/// Placeholder in the server's paste template, that is replaced with the
/// first locked link in the double mode.
const SHORT_URL_PLACEHOLDER: &str = "%shortUrl%";

#[derive(Deserialize)]
pub(crate) struct Config {
    #[serde(default = "default_admaven_api_url")]
    admaven_api_url: url::Url,

    #[serde(default = "default_paste_host_url")]
    paste_host_url: url::Url,

    #[serde(default = "default_linkvertise_url")]
    linkvertise_url: url::Url,

    /// Number of retries of the whole AdMaven flow after the first attempt
    #[serde(default = "default_admaven_max_retries")]
    admaven_max_retries: u32,
}

fn parse_default_url(url: &str) -> url::Url {
    url::Url::parse(url).unwrap_or_else(|err| panic!("BUG: invalid default URL {url}: {err}"))
}

fn default_admaven_api_url() -> url::Url {
    parse_default_url("https://publishers.ad-maven.com")
}

fn default_paste_host_url() -> url::Url {
    parse_default_url("https://justpaster.xyz")
}

fn default_linkvertise_url() -> url::Url {
    parse_default_url("https://link-to.net")
}

fn default_admaven_max_retries() -> u32 {
    3
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum AdType {
    Admaven,
    Linkvertise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShortenMode {
    /// `1of1`: the link is locked once
    Single,

    /// `2of2`: the locked link is put into a paste, and the paste is locked
    /// once again
    Double,
}

impl ShortenMode {
    /// Anything except for `1of1` is treated as the double mode
    pub(crate) fn from_form_value(value: &str) -> Self {
        if value == "1of1" {
            Self::Single
        } else {
            Self::Double
        }
    }
}

pub(crate) struct Shortener {
    locker: Arc<dyn ContentLocker>,
    paste: Arc<dyn PasteHost>,
    linkvertise_url: url::Url,
    admaven_max_retries: u32,
}

impl Shortener {
    pub(crate) fn new(config: Config, http: http::Client) -> Self {
        Self {
            locker: Arc::new(AdMavenClient::new(http.clone(), config.admaven_api_url)),
            paste: Arc::new(PasteClient::new(http, config.paste_host_url)),
            linkvertise_url: config.linkvertise_url,
            admaven_max_retries: config.admaven_max_retries,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_backends(
        locker: Arc<dyn ContentLocker>,
        paste: Arc<dyn PasteHost>,
        admaven_max_retries: u32,
    ) -> Self {
        Self {
            locker,
            paste,
            linkvertise_url: default_linkvertise_url(),
            admaven_max_retries,
        }
    }

    /// Never fails. If the provider doesn't cooperate the original link is
    /// returned wrapped in [`Degradable::Degraded`].
    #[instrument(skip_all, fields(%ad_type, ?mode, server = %server.name))]
    pub(crate) async fn shorten(
        &self,
        ad_type: AdType,
        link: &str,
        server: &ServerConfig,
        mode: ShortenMode,
    ) -> Degradable<String> {
        let template = &server.template;
        let creds = &server.ad_lock;

        let start = Instant::now();

        let result = match ad_type {
            AdType::Admaven => {
                retry_or_degrade(
                    self.admaven_max_retries,
                    || link.to_owned(),
                    |_| {
                        admaven::lock_link(
                            &*self.locker,
                            &*self.paste,
                            creds,
                            template,
                            link,
                            mode,
                        )
                    },
                )
                .await
            }
            AdType::Linkvertise => {
                let user_id = &creds.linkvertise_id;
                match mode {
                    ShortenMode::Single => {
                        linkvertise::wrap_link(&*self.paste, &self.linkvertise_url, user_id, link)
                            .await
                    }
                    ShortenMode::Double => {
                        retry_or_degrade(
                            0,
                            || link.to_owned(),
                            |_| {
                                linkvertise::lock_via_paste(
                                    &*self.paste,
                                    &self.linkvertise_url,
                                    user_id,
                                    template,
                                    link,
                                )
                            },
                        )
                        .await
                    }
                }
            }
        };

        if result.is_degraded() {
            warn!(link, "Falling back to the original link");
        }

        info!(
            outcome = result.outcome(),
            duration = tracing_duration(start.elapsed()),
            "Processed link"
        );

        metrics::record_shortened(ad_type.into(), result.outcome());

        result
    }
}

fn render_template(template: &str, short_url: &str) -> String {
    template.replace(SHORT_URL_PLACEHOLDER, short_url)
}

/// The link is still usable if anti-bypass registration fails, so the error
/// is only logged.
async fn protect_paste(paste: &dyn PasteHost, paste_id: &str, redirect_url: &str) {
    if let Err(err) = paste.set_anti_bypass(paste_id, redirect_url).await {
        warn!(
            err = tracing_err(&err),
            paste_id,
            redirect_url,
            "Failed to register anti-bypass for the paste"
        );
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ShortenError {
    #[error("AdMaven returned a response of unexpected type `{kind}`: {message}")]
    NotFetched { kind: String, message: String },

    #[error("AdMaven returned an empty list of locked links")]
    EmptyMessage,

    #[error("AdMaven returned a malformed response: {body}")]
    MalformedResponse {
        body: String,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{tests::SAMPLE, ServerCatalog};
    use crate::{fatal, Result};
    use async_trait::async_trait;
    use expect_test::expect;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const LINK: &str = "https://files.example/video";

    /// Returns the queued responses, and then fails as AdMaven does with
    /// an invalid token.
    #[derive(Default)]
    struct FakeLocker {
        responses: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLocker {
        fn new(responses: impl IntoIterator<Item = &'static str>) -> Arc<Self> {
            let responses = responses.into_iter().map(|short| Ok(short.to_owned()));
            Arc::new(Self {
                responses: Mutex::new(responses.collect()),
                calls: Default::default(),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentLocker for FakeLocker {
        async fn lock(&self, token: &str, title: &str, url: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{token} | {title} | {url}"));

            self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
                admaven::parse_locker_response(r#"{"type": "error", "message": "Invalid token"}"#)
            })
        }
    }

    struct FakePaste {
        available: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakePaste {
        fn new(available: bool) -> Arc<Self> {
            Arc::new(Self {
                available,
                calls: Default::default(),
            })
        }

        fn record(&self, call: String) -> Result {
            self.calls.lock().unwrap().push(call);
            if !self.available {
                return Err(fatal!("paste host is down"));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PasteHost for FakePaste {
        async fn create_paste(&self, content: &str) -> Result<String> {
            self.record(format!("create: {content}"))?;
            Ok("p1".to_owned())
        }

        async fn set_anti_bypass(&self, paste_id: &str, redirect_url: &str) -> Result {
            self.record(format!("anti-bypass: {paste_id} -> {redirect_url}"))
        }

        async fn shorten_url(&self, url: &str) -> Result<String> {
            let host = url::Url::parse(url).unwrap().host_str().unwrap().to_owned();
            self.record(format!("shorten: {host}"))?;
            Ok("s1".to_owned())
        }

        fn page_url(&self, id: &str) -> String {
            format!("https://paste.example/{id}")
        }
    }

    fn server() -> ServerConfig {
        ServerCatalog::from_json(SAMPLE)
            .unwrap()
            .get("alpha")
            .unwrap()
            .clone()
    }

    #[test_log::test(tokio::test)]
    async fn admaven_single() {
        let locker = FakeLocker::new(["abc"]);
        let shortener = Shortener::with_backends(locker.clone(), FakePaste::new(true), 3);

        let actual = shortener
            .shorten(AdType::Admaven, LINK, &server(), ShortenMode::Single)
            .await;

        assert_eq!(actual, Degradable::Ok("https://lock.example/abc".to_owned()));
        expect![[r#"
            [
                "tok | 1 of 1 | https://files.example/video",
            ]
        "#]]
        .assert_debug_eq(&locker.calls());
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn admaven_gives_up_after_retries() {
        let locker = FakeLocker::failing();
        let shortener = Shortener::with_backends(locker.clone(), FakePaste::new(true), 3);

        let actual = shortener
            .shorten(AdType::Admaven, LINK, &server(), ShortenMode::Single)
            .await;

        assert_eq!(actual, Degradable::Degraded(LINK.to_owned()));
        assert_eq!(locker.calls().len(), 4);
    }

    #[test_log::test(tokio::test)]
    async fn admaven_double_locks_the_paste() {
        let locker = FakeLocker::new(["first", "second"]);
        let paste = FakePaste::new(true);
        let shortener = Shortener::with_backends(locker.clone(), paste.clone(), 3);

        let actual = shortener
            .shorten(AdType::Admaven, LINK, &server(), ShortenMode::Double)
            .await;

        assert_eq!(actual, Degradable::Ok("https://lock.example/second".to_owned()));
        expect![[r#"
            [
                "tok | 2 of 2 | https://files.example/video",
                "tok | 1 of 2 | https://paste.example/p1",
            ]
        "#]]
        .assert_debug_eq(&locker.calls());
        expect![[r#"
            [
                "create: Your link: https://lock.example/first",
                "anti-bypass: p1 -> https://lock.example/second",
            ]
        "#]]
        .assert_debug_eq(&paste.calls());
    }

    #[test_log::test(tokio::test)]
    async fn linkvertise_single() {
        let paste = FakePaste::new(true);
        let shortener = Shortener::with_backends(FakeLocker::failing(), paste.clone(), 3);

        let actual = shortener
            .shorten(AdType::Linkvertise, LINK, &server(), ShortenMode::Single)
            .await;

        assert_eq!(actual, Degradable::Ok("https://paste.example/s1".to_owned()));
        expect![[r#"
            [
                "shorten: link-to.net",
            ]
        "#]]
        .assert_debug_eq(&paste.calls());
    }

    #[test_log::test(tokio::test)]
    async fn linkvertise_falls_back_to_original_link() {
        let shortener =
            Shortener::with_backends(FakeLocker::failing(), FakePaste::new(false), 3);

        for mode in [ShortenMode::Single, ShortenMode::Single, ShortenMode::Double] {
            let actual = shortener
                .shorten(AdType::Linkvertise, LINK, &server(), mode)
                .await;

            assert_eq!(actual, Degradable::Degraded(LINK.to_owned()));
        }
    }

    #[test]
    fn shorten_mode_from_form_value() {
        assert_eq!(ShortenMode::from_form_value("1of1"), ShortenMode::Single);
        assert_eq!(ShortenMode::from_form_value("2of2"), ShortenMode::Double);
        assert_eq!(ShortenMode::from_form_value(""), ShortenMode::Double);
    }
}
