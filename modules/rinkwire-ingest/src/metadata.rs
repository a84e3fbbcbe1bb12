//! Article metadata extraction for user-submitted pages.
//!
//! OpenGraph tags win over document tags: sites put their canonical
//! headline in `og:title` and leave `<title>` for the branded window text.

use std::sync::LazyLock;

use regex::Regex;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));

static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]+property\s*=\s*["']og:title["'][^>]+content\s*=\s*["']([^"']*)["']"#,
    )
    .expect("valid regex")
});

static OG_TITLE_REVERSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]+content\s*=\s*["']([^"']*)["'][^>]+property\s*=\s*["']og:title["']"#,
    )
    .expect("valid regex")
});

static META_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]+name\s*=\s*["']description["'][^>]+content\s*=\s*["']([^"']*)["']"#,
    )
    .expect("valid regex")
});

static OG_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<meta[^>]+property\s*=\s*["']og:description["'][^>]+content\s*=\s*["']([^"']*)["']"#,
    )
    .expect("valid regex")
});

#[derive(Debug, Default, Clone)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Extract title/description from raw page HTML.
pub fn extract_page_metadata(html: &str) -> PageMetadata {
    let title = OG_TITLE_RE
        .captures(html)
        .or_else(|| OG_TITLE_REVERSED_RE.captures(html))
        .or_else(|| TITLE_RE.captures(html))
        .map(|cap| clean(&cap[1]))
        .filter(|t| !t.is_empty());

    let description = OG_DESCRIPTION_RE
        .captures(html)
        .or_else(|| META_DESCRIPTION_RE.captures(html))
        .map(|cap| clean(&cap[1]))
        .filter(|d| !d.is_empty());

    PageMetadata { title, description }
}

fn clean(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
