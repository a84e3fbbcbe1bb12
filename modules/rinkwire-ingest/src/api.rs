//! API fetchers: Reddit public listings, Twitter recent search, and a
//! generic JSON endpoint. All map onto the same raw-item contract as the
//! feed fetchers.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use rinkwire_common::IngestMethod;
use rinkwire_store::SourceRow;

use crate::error::{IngestError, Result};
use crate::fetch::FetchedItem;

/// Post cap per API call.
const API_FETCH_LIMIT: u32 = 25;

pub(crate) async fn fetch_api(
    http: &reqwest::Client,
    source: &SourceRow,
    method: IngestMethod,
) -> Result<Vec<FetchedItem>> {
    match method {
        IngestMethod::Reddit => fetch_reddit(http, source).await,
        IngestMethod::Twitter => fetch_twitter(http, source).await,
        _ => fetch_generic(http, source).await,
    }
}

// --- Reddit ---

#[derive(Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Deserialize)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Deserialize)]
struct RedditPost {
    name: String,
    title: Option<String>,
    selftext: Option<String>,
    permalink: String,
    created_utc: Option<f64>,
}

/// New posts from a subreddit via the public listing endpoint. The
/// subreddit comes from source metadata, falling back to the `/r/<name>`
/// segment of the base URL.
async fn fetch_reddit(http: &reqwest::Client, source: &SourceRow) -> Result<Vec<FetchedItem>> {
    let subreddit = source
        .metadata_str("subreddit")
        .map(str::to_string)
        .or_else(|| subreddit_from_url(&source.base_url))
        .ok_or_else(|| {
            IngestError::NotFetchable(source.id, "reddit source without subreddit".to_string())
        })?;

    let url = format!("https://www.reddit.com/r/{subreddit}/new.json?limit={API_FETCH_LIMIT}");
    debug!(subreddit, "reddit: fetching posts");

    let listing: RedditListing = get_json(http, &url).await?;

    let items = listing
        .data
        .children
        .into_iter()
        .filter_map(|child| {
            let post = child.data;
            let title = post.title.filter(|t| !t.is_empty())?;
            Some(FetchedItem {
                source_item_id: Some(post.name),
                url: format!("https://www.reddit.com{}", post.permalink),
                title: Some(title),
                description: post.selftext.filter(|t| !t.is_empty()),
                content: None,
                published_at: post
                    .created_utc
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0)),
            })
        })
        .collect();

    Ok(items)
}

/// "https://www.reddit.com/r/SanJoseSharks/" -> "SanJoseSharks"
fn subreddit_from_url(url: &str) -> Option<String> {
    let idx = url.find("/r/")?;
    let rest = &url[idx + 3..];
    let name = rest.trim_end_matches('/').split('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

// --- Twitter ---

#[derive(Deserialize)]
struct TwitterSearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
}

#[derive(Deserialize)]
struct Tweet {
    id: String,
    text: String,
    created_at: Option<String>,
}

/// Recent-search results for the configured query. Requires a bearer token
/// in source metadata.
async fn fetch_twitter(http: &reqwest::Client, source: &SourceRow) -> Result<Vec<FetchedItem>> {
    let bearer_token = source.metadata_str("bearer_token").ok_or_else(|| {
        IngestError::NotFetchable(source.id, "twitter source without bearer_token".to_string())
    })?;
    let query = source.metadata_str("query").ok_or_else(|| {
        IngestError::NotFetchable(source.id, "twitter source without query".to_string())
    })?;

    let url = "https://api.twitter.com/2/tweets/search/recent";
    debug!(query, "twitter: searching recent tweets");

    let max_results = API_FETCH_LIMIT.to_string();
    let response = http
        .get(url)
        .bearer_auth(bearer_token)
        .query(&[
            ("query", query),
            ("max_results", max_results.as_str()),
            ("tweet.fields", "created_at"),
        ])
        .send()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::FetchFailed(format!("{url}: HTTP {status}")));
    }

    let body: TwitterSearchResponse = response
        .json()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{url}: {e}")))?;

    let items = body
        .data
        .into_iter()
        .map(|tweet| FetchedItem {
            url: format!("https://twitter.com/i/web/status/{}", tweet.id),
            source_item_id: Some(tweet.id),
            title: Some(tweet.text.clone()),
            description: None,
            content: Some(tweet.text),
            published_at: tweet
                .created_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
        .collect();

    Ok(items)
}

// --- Generic JSON endpoint ---

#[derive(Deserialize)]
struct GenericItem {
    id: Option<String>,
    url: String,
    title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
}

/// A configured endpoint returning a JSON array of items in our shape.
async fn fetch_generic(http: &reqwest::Client, source: &SourceRow) -> Result<Vec<FetchedItem>> {
    let endpoint = source.metadata_str("endpoint").ok_or_else(|| {
        IngestError::NotFetchable(source.id, "api source without endpoint".to_string())
    })?;

    let raw: Vec<GenericItem> = get_json(http, endpoint).await?;

    let items = raw
        .into_iter()
        .map(|item| FetchedItem {
            source_item_id: item.id,
            url: item.url,
            title: item.title,
            description: item.description,
            content: None,
            published_at: item
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
        .collect();

    Ok(items)
}

async fn get_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
) -> Result<T> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::FetchFailed(format!("{url}: HTTP {status}")));
    }

    response
        .json()
        .await
        .map_err(|e| IngestError::FetchFailed(format!("{url}: {e}")))
}
