//! RSS/Atom fetching with a sanitize-and-reparse fallback.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::fetch::FetchedItem;
use crate::sanitize::sanitize_feed_xml;

/// Fetch and parse a feed. If the first parse fails, the payload is
/// sanitized and parsed once more; only when that also recovers nothing does
/// the fetch fail (retryable).
pub(crate) async fn fetch_rss(
    http: &reqwest::Client,
    feed_url: &str,
) -> Result<Vec<FetchedItem>> {
    let response = http
        .get(feed_url)
        .send()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{feed_url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::FetchFailed(format!("{feed_url}: HTTP {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{feed_url}: {e}")))?;

    debug!(feed_url, bytes = bytes.len(), "feed fetched");

    let feed = match feed_rs::parser::parse(&bytes[..]) {
        Ok(feed) => feed,
        Err(parse_err) => {
            let cleaned = sanitize_feed_xml(&bytes);
            match feed_rs::parser::parse(cleaned.as_bytes()) {
                Ok(feed) if !feed.entries.is_empty() => {
                    info!(
                        feed_url,
                        recovered = feed.entries.len(),
                        "sanitization recovered feed entries"
                    );
                    feed
                }
                _ => {
                    return Err(IngestError::MalformedFeed(format!(
                        "{feed_url}: {parse_err}"
                    )))
                }
            }
        }
    };

    Ok(feed.entries.into_iter().filter_map(entry_to_item).collect())
}

fn entry_to_item(entry: feed_rs::model::Entry) -> Option<FetchedItem> {
    let url = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

    let source_item_id = (!entry.id.is_empty()).then(|| entry.id.clone());

    let published_at = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.with_timezone(&Utc));

    Some(FetchedItem {
        source_item_id,
        url,
        title: entry.title.map(|t| t.content),
        description: entry.summary.map(|s| s.content),
        content: entry.content.and_then(|c| c.body),
        published_at,
    })
}
