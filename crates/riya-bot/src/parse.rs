//! Parsing of the bulk text submitted via the web form.

use crate::prelude::*;
use lazy_regex::regex_replace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BulkEntry {
    pub(crate) name: String,
    pub(crate) link: String,
}

/// Single unit of work parsed from the bulk text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BulkItem {
    /// URL of a page that must be scraped to get the [`BulkEntry`]
    ScrapeSource(String),
    Entry(BulkEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseMode {
    /// Every line is a URL of a page to scrape
    Scrape,

    /// Lines go in pairs of a name and a link
    Paired,
}

pub(crate) fn parse(text: &str, mode: ParseMode) -> Vec<BulkItem> {
    let items: Vec<_> = match mode {
        ParseMode::Scrape => parse_scrape_sources(text)
            .map(|source| BulkItem::ScrapeSource(source.to_owned()))
            .collect(),
        ParseMode::Paired => parse_pairs(text).into_iter().map(BulkItem::Entry).collect(),
    };

    debug!(?mode, items = items.len(), "Parsed bulk input");

    items
}

fn is_link(line: &str) -> bool {
    line.starts_with("http")
}

/// Splits the text into trimmed non-empty lines
fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

fn parse_scrape_sources(text: &str) -> impl Iterator<Item = &str> {
    lines(text).filter(|line| is_link(line))
}

fn parse_pairs(text: &str) -> Vec<BulkEntry> {
    let lines: Vec<_> = lines(text).collect();

    lines
        .chunks(2)
        .filter_map(|pair| match *pair {
            [name, link] => parse_pair(name, Some(link)),
            [single] => parse_pair(single, None),
            _ => None,
        })
        .collect()
}

fn parse_pair(line_a: &str, line_b: Option<&str>) -> Option<BulkEntry> {
    if let Some(line_b) = line_b {
        if line_a.to_uppercase().starts_with("NAME:") && line_b.to_uppercase().starts_with("LINK:")
        {
            let name = regex_replace!(r"(?i)NAME\s*:\s*", line_a, "").trim().to_owned();
            let link = regex_replace!(r"(?i)LINK\s*:\s*", line_b, "").trim().to_owned();

            return is_link(&link).then_some(BulkEntry { name, link });
        }

        if is_link(line_b) && !is_link(line_a) {
            return Some(BulkEntry {
                name: line_a.to_owned(),
                link: line_b.to_owned(),
            });
        }
    }

    if is_link(line_a) {
        return Some(BulkEntry {
            name: line_a.to_owned(),
            link: line_a.to_owned(),
        });
    }

    trace!(line_a, line_b, "Skipping malformed pair of lines");

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    #[track_caller]
    fn assert_parse(input: &str, mode: ParseMode, expected: Expect) {
        let actual = parse(input, mode)
            .into_iter()
            .map(|item| match item {
                BulkItem::ScrapeSource(source) => format!("source: {source}"),
                BulkItem::Entry(BulkEntry { name, link }) => format!("{name} -> {link}"),
            })
            .collect::<Vec<_>>()
            .join("\n");

        expected.assert_eq(&actual);
    }

    #[test]
    fn explicit_name_link_prefixes() {
        assert_parse(
            "NAME: A\nLINK: http://x",
            ParseMode::Paired,
            expect!["A -> http://x"],
        );
        assert_parse(
            "name:  Spaced Out \nlink:http://x/y",
            ParseMode::Paired,
            expect!["Spaced Out -> http://x/y"],
        );
    }

    #[test]
    fn explicit_prefix_with_non_link_is_dropped() {
        assert_parse("NAME: A\nLINK: ftp://x", ParseMode::Paired, expect![""]);
    }

    #[test]
    fn title_followed_by_link() {
        assert_parse("Title\nhttp://y", ParseMode::Paired, expect!["Title -> http://y"]);
    }

    #[test]
    fn single_link_is_both_name_and_link() {
        assert_parse("http://z", ParseMode::Paired, expect!["http://z -> http://z"]);
        assert_parse(
            "http://a\nhttp://b",
            ParseMode::Paired,
            expect!["http://a -> http://a"],
        );
    }

    #[test]
    fn odd_trailing_non_link_is_dropped() {
        assert_parse(
            "Title\nhttp://y\ndangling",
            ParseMode::Paired,
            expect!["Title -> http://y"],
        );
        assert_parse(
            "Title\nhttp://y\nhttp://tail",
            ParseMode::Paired,
            expect![[r#"
                Title -> http://y
                http://tail -> http://tail"#]],
        );
    }

    #[test]
    fn malformed_pair_still_advances_by_two() {
        assert_parse(
            "foo\nbar\nTitle\nhttp://y",
            ParseMode::Paired,
            expect!["Title -> http://y"],
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dense = "Title\nhttp://y\nOther\nhttp://w";
        let sparse = "\n\n  Title  \r\n\n\nhttp://y\r\n \nOther\n\n   \nhttp://w\n\n";

        assert_eq!(
            parse(dense, ParseMode::Paired),
            parse(sparse, ParseMode::Paired)
        );
    }

    #[test]
    fn empty_input() {
        assert_parse("", ParseMode::Paired, expect![""]);
        assert_parse(" \n\r\n ", ParseMode::Scrape, expect![""]);
    }

    #[test]
    fn scrape_mode_keeps_only_links() {
        assert_parse(
            "intro\nhttps://rentry.co/a\nnot a link\n  https://rentry.co/b  \nfooter",
            ParseMode::Scrape,
            expect![[r#"
                source: https://rentry.co/a
                source: https://rentry.co/b"#]],
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        let input = "NAME: A\nLINK: http://x\nTitle\nhttp://y\nhttp://z";
        let first = parse(input, ParseMode::Paired);
        let second = parse(input, ParseMode::Paired);

        assert_eq!(first, second);
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }
}
