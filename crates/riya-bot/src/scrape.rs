//! Resolves the name and the destination link of an entry from a page hosted
//! on a paste-sharing site (rentry-like markup).

use crate::parse::BulkEntry;
use crate::prelude::*;
use crate::{err, http, Result};
use lazy_regex::regex_replace_all;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

pub(crate) struct Scraper {
    http: http::Client,
}

impl Scraper {
    pub(crate) fn new(http: http::Client) -> Self {
        Self { http }
    }

    #[instrument(skip(self))]
    pub(crate) async fn scrape(&self, url: &str) -> Result<BulkEntry> {
        let html = self.http.get(url).read_text().await?;
        let entry = extract_entry(&html)?;

        info!(name = %entry.name, link = %entry.link, "Scraped the entry");

        Ok(entry)
    }
}

fn selector(cell: &'static OnceLock<Selector>, css: &'static str) -> &'static Selector {
    cell.get_or_init(|| {
        Selector::parse(css).unwrap_or_else(|err| panic!("BUG: invalid CSS selector `{css}`: {err}"))
    })
}

fn content_block() -> &'static Selector {
    static CELL: OnceLock<Selector> = OnceLock::new();
    selector(&CELL, ".entry-text article div")
}

fn paragraph() -> &'static Selector {
    static CELL: OnceLock<Selector> = OnceLock::new();
    selector(&CELL, "p")
}

fn external_link() -> &'static Selector {
    static CELL: OnceLock<Selector> = OnceLock::new();
    selector(&CELL, "a.external")
}

/// Takes the first paragraph of the primary content block as the name and
/// the first external anchor in that block as the link.
pub(crate) fn extract_entry(html: &str) -> Result<BulkEntry> {
    let document = Html::parse_document(html);

    let block = document
        .select(content_block())
        .next()
        .ok_or_else(|| err!(ScrapeError::MissingContent))?;

    let name = block
        .select(paragraph())
        .next()
        .map(element_text)
        .map(|text| sanitize_name(&text))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| err!(ScrapeError::MissingName))?;

    let link = block
        .select(external_link())
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.is_empty())
        .ok_or_else(|| err!(ScrapeError::MissingLink))?;

    Ok(BulkEntry {
        name,
        link: link.to_owned(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Leaves only ASCII word characters, whitespace, hyphens and periods.
fn sanitize_name(raw: &str) -> String {
    regex_replace_all!(r"[^A-Za-z0-9_\s\-.]", raw.trim(), "")
        .trim()
        .to_owned()
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ScrapeError {
    #[error("The page has no primary content block")]
    MissingContent,

    #[error("The content block has no paragraph with the name")]
    MissingName,

    #[error("The content block has no external link")]
    MissingLink,
}
