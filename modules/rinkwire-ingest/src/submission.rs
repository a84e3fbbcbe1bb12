//! User submission processing: normalize, dedup, fetch metadata, create the
//! raw item, and propose a candidate source for unknown domains.

use tracing::{info, warn};

use rinkwire_common::urls::{extract_domain, ingest_hash, normalize_url};
use rinkwire_common::{IngestMethod, SourceCategory};
use rinkwire_store::{NewCandidateSource, NewRawItem, SourceRow, Store};

use crate::discovery::discover_rss_feed;
use crate::error::{IngestError, Result};
use crate::metadata::extract_page_metadata;

/// Terminal result of processing one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The URL already has a story variant (or raced to one).
    Duplicate,
    /// Metadata fetch failed; nothing to ingest.
    Rejected { reason: String },
    /// A raw item was created and should be enriched.
    Published { raw_item_id: i64 },
    /// Already processed earlier; nothing to do.
    AlreadyProcessed,
}

pub struct SubmissionProcessor {
    http: reqwest::Client,
    store: Store,
}

impl SubmissionProcessor {
    pub fn new(store: Store, http: reqwest::Client) -> Self {
        Self { http, store }
    }

    /// Process a submission end to end. Statuses other than `received` are
    /// terminal; reprocessing is a no-op.
    pub async fn process(&self, submission_id: i64) -> Result<SubmissionOutcome> {
        let submission = self
            .store
            .submission_by_id(submission_id)
            .await?
            .ok_or_else(|| {
                IngestError::Other(anyhow::anyhow!("submission {submission_id} not found"))
            })?;

        if submission.status != "received" {
            return Ok(SubmissionOutcome::AlreadyProcessed);
        }

        info!(submission_id, url = %submission.url, "processing submission");

        let normalized_url = normalize_url(&submission.url);
        let domain = extract_domain(&normalized_url);
        self.store
            .set_submission_normalization(submission_id, &normalized_url, &domain)
            .await?;

        // Known URL: link and stop.
        if let Some(variant) = self.store.variant_by_url(&normalized_url).await? {
            let cluster_id = self.store.variant_cluster_id(variant.id).await?;
            self.store
                .mark_submission_duplicate(submission_id, Some(variant.id), cluster_id)
                .await?;
            info!(submission_id, variant_id = variant.id, "submission is a duplicate");
            return Ok(SubmissionOutcome::Duplicate);
        }

        // Fetch the page for title/description.
        let page = match self.fetch_page(&normalized_url).await {
            Ok(html) => html,
            Err(e) => {
                let reason = format!("Failed to fetch URL: {e}");
                self.store
                    .mark_submission_rejected(submission_id, &reason)
                    .await?;
                warn!(submission_id, error = %e, "submission rejected");
                return Ok(SubmissionOutcome::Rejected { reason });
            }
        };
        let page_meta = extract_page_metadata(&page);

        let source = self.store.user_submission_source().await?;

        let created = self
            .store
            .create_raw_item(NewRawItem {
                source_id: source.id,
                source_item_id: None,
                ingestion_origin: "user_submitted".to_string(),
                original_url: submission.url.clone(),
                canonical_url: normalized_url.clone(),
                ingest_hash: ingest_hash(source.id, &normalized_url, page_meta.title.as_deref()),
                raw_title: page_meta.title,
                raw_description: page_meta.description,
                raw_content: None,
                published_at: None,
            })
            .await?;

        let Some(raw_item) = created else {
            self.store
                .mark_submission_duplicate(submission_id, None, None)
                .await?;
            return Ok(SubmissionOutcome::Duplicate);
        };

        self.store
            .mark_submission_published(submission_id, raw_item.id)
            .await?;

        // New domain: propose a candidate source (or count the repeat).
        if !domain.is_empty() {
            let approved = self.store.approved_sources().await?;
            if !domain_is_known(&approved, &domain) {
                self.propose_candidate_source(&domain, submission_id).await?;
            }
        }

        info!(submission_id, raw_item_id = raw_item.id, "submission published");
        Ok(SubmissionOutcome::Published {
            raw_item_id: raw_item.id,
        })
    }

    async fn fetch_page(&self, url: &str) -> anyhow::Result<String> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {status}");
        }
        Ok(response.text().await?)
    }

    /// Create or bump the candidate source for a newly observed domain,
    /// attempting RSS discovery on the way in.
    async fn propose_candidate_source(&self, domain: &str, submission_id: i64) -> Result<()> {
        if let Some(existing) = self.store.record_candidate_submission(domain).await? {
            info!(
                domain,
                times_submitted = existing.times_submitted,
                "candidate source already known"
            );
            return Ok(());
        }

        let base_url = format!("https://{domain}");
        let feed_url = discover_rss_feed(&self.http, &base_url).await;

        let candidate = self
            .store
            .create_candidate_source(NewCandidateSource {
                domain: domain.to_string(),
                base_url,
                discovered_from_submission_id: Some(submission_id),
                suggested_category: Some(SourceCategory::Other),
                suggested_ingest_method: feed_url.as_ref().map(|_| IngestMethod::Rss),
                discovered_feed_url: feed_url,
                rss_discovery_attempted: true,
            })
            .await?;

        info!(
            domain,
            candidate_id = candidate.id,
            rss_found = candidate.rss_discovery_success,
            "candidate source created"
        );

        Ok(())
    }
}

/// A domain is known when any approved source lives on it (base or feed
/// URL).
pub(crate) fn domain_is_known(approved_sources: &[SourceRow], domain: &str) -> bool {
    approved_sources.iter().any(|source| {
        extract_domain(&source.base_url) == domain
            || source
                .feed_url
                .as_deref()
                .is_some_and(|feed| extract_domain(feed) == domain)
    })
}
