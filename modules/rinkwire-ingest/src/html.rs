//! Listing-page scraping for HTML sources.
//!
//! Per-source configuration lives in the source metadata map:
//! `link_pattern` (required) filters anchor targets, `listing_url`
//! (optional) overrides the base URL as the page to scrape. Anchor text
//! becomes the raw title.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use rinkwire_store::SourceRow;

use crate::error::{IngestError, Result};
use crate::fetch::FetchedItem;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).expect("valid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));

pub(crate) async fn fetch_html_listing(
    http: &reqwest::Client,
    source: &SourceRow,
) -> Result<Vec<FetchedItem>> {
    let link_pattern = source.metadata_str("link_pattern").ok_or_else(|| {
        IngestError::NotFetchable(source.id, "html source without link_pattern".to_string())
    })?;
    let listing_url = source.metadata_str("listing_url").unwrap_or(&source.base_url);

    let response = http
        .get(listing_url)
        .send()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{listing_url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::FetchFailed(format!(
            "{listing_url}: HTTP {status}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{listing_url}: {e}")))?;

    Ok(extract_listing_items(&body, listing_url, link_pattern))
}

/// Pull (link, anchor-text) pairs matching the pattern out of a listing
/// page. Relative hrefs resolve against the page URL; fragments are
/// dropped; duplicates keep the first anchor text seen.
pub(crate) fn extract_listing_items(
    html: &str,
    base_url: &str,
    link_pattern: &str,
) -> Vec<FetchedItem> {
    let base = url::Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for cap in ANCHOR_RE.captures_iter(html) {
        let href = &cap[1];
        let Some(resolved) = resolve_href(href, base.as_ref()) else {
            continue;
        };
        if !resolved.contains(link_pattern) {
            continue;
        }
        if !seen.insert(resolved.clone()) {
            continue;
        }

        let text = anchor_text(&cap[2]);
        items.push(FetchedItem {
            source_item_id: None,
            url: resolved,
            title: (!text.is_empty()).then_some(text),
            description: None,
            content: None,
            published_at: None,
        });
    }

    items
}

fn resolve_href(raw: &str, base: Option<&url::Url>) -> Option<String> {
    let mut parsed = if raw.starts_with("http://") || raw.starts_with("https://") {
        url::Url::parse(raw).ok()?
    } else {
        base?.join(raw).ok()?
    };
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

fn anchor_text(inner: &str) -> String {
    let stripped = TAG_RE.replace_all(inner, " ");
    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
