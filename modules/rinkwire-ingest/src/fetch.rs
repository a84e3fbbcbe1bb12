//! Fetch dispatch and the shared raw-item output contract.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use rinkwire_common::urls::{ingest_hash, normalize_url};
use rinkwire_common::IngestMethod;
use rinkwire_store::{NewRawItem, SourceRow, Store};

use crate::error::{IngestError, Result};
use crate::{api, html, rss, USER_AGENT};

/// One item pulled from a source, before persistence. Every fetcher flavor
/// produces these.
#[derive(Debug, Clone)]
pub struct FetchedItem {
    /// Source-provided id (RSS guid, platform post id), for idempotency.
    pub source_item_id: Option<String>,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// What a fetch produced: raw item ids to enrich, plus the duplicate count.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub new_item_ids: Vec<i64>,
    pub skipped: usize,
}

pub struct Fetcher {
    http: reqwest::Client,
    store: Store,
}

impl Fetcher {
    /// Build a fetcher with a bounded-timeout, redirect-following client.
    pub fn new(store: Store, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http, store })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch one source: dispatch by ingest method, persist new raw items,
    /// and update the source's fetch bookkeeping. On failure the error
    /// counter is bumped and the error bubbles to the scheduler for retry.
    pub async fn fetch_source(&self, source: &SourceRow) -> Result<FetchReport> {
        let outcome = self.fetch_items(source).await;

        match outcome {
            Ok(items) => {
                let report = self.persist_items(source, items).await?;
                self.store.mark_fetch_success(source.id).await?;
                info!(
                    source_id = source.id,
                    source = %source.name,
                    new = report.new_item_ids.len(),
                    skipped = report.skipped,
                    "fetch complete"
                );
                Ok(report)
            }
            Err(e) => {
                let errors = self.store.mark_fetch_failure(source.id).await?;
                warn!(
                    source_id = source.id,
                    source = %source.name,
                    consecutive_errors = errors,
                    error = %e,
                    "fetch failed"
                );
                Err(e)
            }
        }
    }

    /// Closed dispatch: ingest method → fetcher.
    async fn fetch_items(&self, source: &SourceRow) -> Result<Vec<FetchedItem>> {
        let method = source.ingest_method().ok_or_else(|| {
            IngestError::NotFetchable(source.id, format!("unknown method {}", source.ingest_method))
        })?;

        match method {
            IngestMethod::Rss => {
                let feed_url = source.feed_url.as_deref().ok_or_else(|| {
                    IngestError::NotFetchable(source.id, "rss source without feed_url".to_string())
                })?;
                rss::fetch_rss(&self.http, feed_url).await
            }
            IngestMethod::Html => html::fetch_html_listing(&self.http, source).await,
            IngestMethod::Api | IngestMethod::Reddit | IngestMethod::Twitter => {
                api::fetch_api(&self.http, source, method).await
            }
        }
    }

    /// Create raw items idempotently; duplicates are skips, not errors.
    async fn persist_items(
        &self,
        source: &SourceRow,
        items: Vec<FetchedItem>,
    ) -> Result<FetchReport> {
        let mut report = FetchReport::default();

        for item in items {
            if item.url.is_empty() {
                report.skipped += 1;
                continue;
            }

            let canonical_url = normalize_url(&item.url);
            let hash = ingest_hash(source.id, &canonical_url, item.title.as_deref());

            let created = self
                .store
                .create_raw_item(NewRawItem {
                    source_id: source.id,
                    source_item_id: item.source_item_id,
                    ingestion_origin: "scheduled".to_string(),
                    original_url: item.url,
                    canonical_url,
                    ingest_hash: hash,
                    raw_title: item.title,
                    raw_description: item.description,
                    raw_content: item.content,
                    published_at: item.published_at,
                })
                .await?;

            match created {
                Some(row) => report.new_item_ids.push(row.id),
                None => report.skipped += 1,
            }
        }

        Ok(report)
    }
}
