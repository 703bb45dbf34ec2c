use crate::parse::{BulkEntry, ParseMode};
use lazy_regex::regex_replace_all;

const TERABOX_DEFAULT_TITLE: &str = "Open Links & Watch Online Easily + Download";
const COLLECTION_DEFAULT_TITLE: &str = "New Collection Post";

/// Category of the posts. It defines where the image and the title of the
/// post come from. Unknown channel names are all treated the same way.
#[derive(Debug, Clone, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
pub(crate) enum Channel {
    /// Every entry is a page to scrape the title and the link from
    #[strum(serialize = "OF-Models")]
    OfModels,

    #[strum(serialize = "TeraBox")]
    TeraBox,

    /// The uploaded image is posted as is, without the watermark
    #[strum(serialize = "Collection")]
    Collection,

    /// Random stock image with the label overlay, the label is the title
    #[strum(default)]
    Other(String),
}

impl Channel {
    pub(crate) fn from_name(name: &str) -> Self {
        name.parse()
            .unwrap_or_else(|_| Self::Other(name.to_owned()))
    }

    /// Name of the channel in the server catalog
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Other(name) => name,
            _ => self.as_ref(),
        }
    }

    /// These channels use the uploaded image instead of a stock one
    pub(crate) fn requires_upload(&self) -> bool {
        matches!(self, Self::OfModels | Self::TeraBox | Self::Collection)
    }

    pub(crate) fn parse_mode(&self) -> ParseMode {
        match self {
            Self::OfModels => ParseMode::Scrape,
            _ => ParseMode::Paired,
        }
    }

    pub(crate) fn skips_composition(&self) -> bool {
        matches!(self, Self::Collection)
    }

    pub(crate) fn title(&self, entry: &BulkEntry, label: Option<&str>) -> String {
        match self {
            Self::OfModels => entry.name.clone(),
            Self::TeraBox => {
                if entry.name.is_empty() || entry.name == entry.link {
                    TERABOX_DEFAULT_TITLE.to_owned()
                } else {
                    entry.name.to_uppercase()
                }
            }
            Self::Collection => {
                if entry.name.is_empty() {
                    COLLECTION_DEFAULT_TITLE.to_owned()
                } else {
                    entry.name.to_uppercase()
                }
            }
            Self::Other(_) => match label {
                Some(label) => label.replace('-', " ").to_uppercase(),
                None => entry.name.to_uppercase(),
            },
        }
    }
}

/// Leaves only ASCII letters, digits, whitespace and `-_.`
pub(crate) fn clean_title(title: &str) -> String {
    regex_replace_all!(r"[^a-zA-Z0-9\s\-_.]", title, "")
        .trim()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn entry(name: &str, link: &str) -> BulkEntry {
        BulkEntry {
            name: name.to_owned(),
            link: link.to_owned(),
        }
    }

    #[test]
    fn channel_names_round_trip() {
        for name in ["OF-Models", "TeraBox", "Collection", "Leaks-Vids"] {
            assert_eq!(Channel::from_name(name).name(), name);
        }
        assert_eq!(
            Channel::from_name("State-Snap"),
            Channel::Other("State-Snap".to_owned())
        );
    }

    #[test]
    fn titles() {
        let link = "https://files.example/x";

        let titles = [
            Channel::TeraBox.title(&entry("My clip", link), None),
            Channel::TeraBox.title(&entry(link, link), None),
            Channel::Collection.title(&entry("Set 1", link), None),
            Channel::Collection.title(&entry("", link), None),
            Channel::Other("Leaks-Vids".to_owned()).title(&entry(link, link), Some("hot-new-leak")),
            Channel::OfModels.title(&entry("Scraped Name", link), Some("ignored")),
        ];

        expect![[r#"
            [
                "MY CLIP",
                "Open Links & Watch Online Easily + Download",
                "SET 1",
                "New Collection Post",
                "HOT NEW LEAK",
                "Scraped Name",
            ]
        "#]]
        .assert_debug_eq(&titles);
    }

    #[test]
    fn clean_title_smoke() {
        expect!["OPEN LINKS  WATCH ONLINE EASILY  DOWNLOAD"]
            .assert_eq(&clean_title(TERABOX_DEFAULT_TITLE));
        expect!["EP_1.5 - FINAL"].assert_eq(&clean_title("  ep_1.5 - final!! 🔥 "));
    }
}
