//! URL canonicalization and ingest fingerprinting.
//!
//! Canonical URLs are the primary dedup key across fetchers and user
//! submissions, so normalization must be idempotent: feeding a canonical URL
//! back through `normalize_url` yields the same string.

use sha2::{Digest, Sha256};
use url::Url;

/// Non-`utm_` query parameters stripped during canonicalization.
const TRACKING_PARAMS: &[&str] = &["ref", "fbclid"];

/// Canonicalize a URL for deduplication: drop the fragment, strip tracking
/// query parameters, keep scheme/host/path as-is. Unparseable input is
/// returned trimmed rather than rejected — the dedup keys degrade gracefully.
pub fn normalize_url(raw: &str) -> String {
    let mut parsed = match Url::parse(raw.trim()) {
        Ok(u) => u,
        Err(_) => return raw.trim().to_string(),
    };

    parsed.set_fragment(None);

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &kept {
            query.append_pair(k, v);
        }
        parsed.set_query(Some(&query.finish()));
    }

    parsed.to_string()
}

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

/// Extract the host from a URL, lowercased, without port.
/// Returns an empty string for unparseable input.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

/// Fallback dedup fingerprint:
/// `sha256("{source_id}:{canonical_url}:{title-or-empty}")`, hex-encoded.
pub fn ingest_hash(source_id: i64, canonical_url: &str, title: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}:{}:{}",
        source_id,
        canonical_url,
        title.unwrap_or("")
    ));
    hex::encode(hasher.finalize())
}
