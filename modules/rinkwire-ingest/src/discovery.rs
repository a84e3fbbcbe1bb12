//! RSS feed discovery for newly observed domains.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

/// Probe timeout. Discovery is best-effort and must not hold up submission
/// processing.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Well-known feed locations tried after the homepage `<link>` probe.
const WELL_KNOWN_FEED_PATHS: &[&str] = &[
    "/feed",
    "/rss",
    "/feed.xml",
    "/rss.xml",
    "/atom.xml",
    "/feeds/posts/default",
];

static FEED_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link[^>]+type\s*=\s*["']application/rss\+xml["'][^>]*>"#)
        .expect("valid regex")
});

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

/// Try to find a working feed for a site: inspect the homepage for an RSS
/// `<link>` tag, then probe the well-known paths, validating each candidate
/// by parsing it as a feed with at least one entry.
pub async fn discover_rss_feed(http: &reqwest::Client, base_url: &str) -> Option<String> {
    if let Ok(response) = http
        .get(base_url)
        .timeout(DISCOVERY_TIMEOUT)
        .send()
        .await
    {
        if let Ok(html) = response.text().await {
            if let Some(found) = feed_link_from_html(&html, base_url) {
                debug!(base_url, feed = %found, "feed discovered via link tag");
                return Some(found);
            }
        }
    }

    for path in WELL_KNOWN_FEED_PATHS {
        let candidate = format!("{}{}", base_url.trim_end_matches('/'), path);
        let Ok(response) = http
            .get(&candidate)
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await
        else {
            continue;
        };
        if !response.status().is_success() {
            continue;
        }
        let Ok(bytes) = response.bytes().await else {
            continue;
        };
        if let Ok(feed) = feed_rs::parser::parse(&bytes[..]) {
            if !feed.entries.is_empty() {
                debug!(base_url, feed = %candidate, "feed discovered via well-known path");
                return Some(candidate);
            }
        }
    }

    None
}

/// Extract the first RSS `<link>` href from homepage HTML, resolving
/// relative paths against the base URL.
pub(crate) fn feed_link_from_html(html: &str, base_url: &str) -> Option<String> {
    let tag = FEED_LINK_RE.find(html)?;
    let href = HREF_RE.captures(tag.as_str())?.get(1)?.as_str();

    if href.starts_with("http") {
        return Some(href.to_string());
    }

    let base = url::Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}
