use crate::shorten::AdType;
use itertools::Itertools;
use teloxide::utils::markdown;

const DISCORD_HEADER: &str = "**⚝──⭒─𝓜𝓮𝓰𝓪⭑𝓕𝓸𝓵𝓭𝓮𝓻─⭒──⚝**";
const DISCORD_FOOTER: &str = "**⚝─────⭒────⭑────⭒─────⚝**";

const TELEGRAM_HEADER: &str = "*⚝──⭒─𝓜𝓮𝓰𝓪⭑𝓕𝓸𝓵𝓭𝓮𝓻─⭒──⚝*";
const TELEGRAM_FOOTER: &str = "*⚝────⭒────⭑────⭒────⚝*";

/// Texts of the same post for every platform. The Telegram one is formatted
/// with MarkdownV2.
#[derive(Debug)]
pub(crate) struct Captions {
    pub(crate) discord: String,
    pub(crate) telegram: String,
}

impl Captions {
    /// `links` are the shortened links in the order of the providers
    pub(crate) fn build(title: &str, links: &[(AdType, String)]) -> Self {
        let discord_options = links
            .iter()
            .map(|(ad_type, link)| {
                format!("\n***Option ({}):*** **{link}**", abbreviation(*ad_type))
            })
            .join("");

        let telegram_options = links
            .iter()
            .map(|(ad_type, link)| {
                let abbr = abbreviation(*ad_type);
                format!("\n***_Option \\({abbr}\\):_*** *{}*", escape(link))
            })
            .join("");

        let discord =
            format!("**{title}**\n\n{DISCORD_HEADER}\n{discord_options}\n\n{DISCORD_FOOTER}");

        let telegram = format!(
            "*{}*\n\n{TELEGRAM_HEADER}\n{telegram_options}\n\n{TELEGRAM_FOOTER}",
            escape(title)
        );

        Self { discord, telegram }
    }
}

/// Content of the post sent to the premium webhook. It contains the
/// original link instead of the monetized ones.
pub(crate) fn premium_text(title: &str, link: &str) -> String {
    format!("**{title}**\n**Link: {link} **")
}

fn abbreviation(ad_type: AdType) -> &'static str {
    match ad_type {
        AdType::Admaven => "AM",
        AdType::Linkvertise => "LV",
    }
}

fn escape(text: &str) -> String {
    markdown::escape(&text.replace('\\', "\\\\"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn captions_with_both_providers() {
        let captions = Captions::build(
            "MY VIDEO 1.5",
            &[
                (AdType::Admaven, "https://lock.example/abc".to_owned()),
                (AdType::Linkvertise, "https://paste.example/s1".to_owned()),
            ],
        );

        expect![[r#"
            **MY VIDEO 1.5**

            **⚝──⭒─𝓜𝓮𝓰𝓪⭑𝓕𝓸𝓵𝓭𝓮𝓻─⭒──⚝**

            ***Option (AM):*** **https://lock.example/abc**
            ***Option (LV):*** **https://paste.example/s1**

            **⚝─────⭒────⭑────⭒─────⚝**"#]]
        .assert_eq(&captions.discord);

        expect![[r#"
            *MY VIDEO 1\.5*

            *⚝──⭒─𝓜𝓮𝓰𝓪⭑𝓕𝓸𝓵𝓭𝓮𝓻─⭒──⚝*

            ***_Option \(AM\):_*** *https://lock\.example/abc*
            ***_Option \(LV\):_*** *https://paste\.example/s1*

            *⚝────⭒────⭑────⭒────⚝*"#]]
        .assert_eq(&captions.telegram);
    }

    #[test]
    fn captions_without_providers() {
        let captions = Captions::build("TITLE", &[]);

        expect![[r#"
            **TITLE**

            **⚝──⭒─𝓜𝓮𝓰𝓪⭑𝓕𝓸𝓵𝓭𝓮𝓻─⭒──⚝**


            **⚝─────⭒────⭑────⭒─────⚝**"#]]
        .assert_eq(&captions.discord);
    }

    #[test]
    fn premium_text_smoke() {
        expect![[r#"
            **TITLE**
            **Link: https://files.example/video **"#]]
        .assert_eq(&premium_text("TITLE", "https://files.example/video"));
    }
}
