//! User submissions and candidate sources.

use chrono::{DateTime, Utc};

use rinkwire_common::{IngestMethod, SourceCategory, SourceStatus};

use crate::error::Result;
use crate::rows::{CandidateSourceRow, SourceRow, SubmissionRow};
use crate::store::{NewSource, Store};

pub struct NewCandidateSource {
    pub domain: String,
    pub base_url: String,
    pub discovered_from_submission_id: Option<i64>,
    pub suggested_category: Option<SourceCategory>,
    pub suggested_ingest_method: Option<IngestMethod>,
    pub discovered_feed_url: Option<String>,
    pub rss_discovery_attempted: bool,
}

impl Store {
    /// Insert a submission, enforcing the per-IP hourly cap by counting
    /// recent rows before the insert. Returns `None` when the IP is at the
    /// cap.
    pub async fn create_submission(
        &self,
        url: &str,
        submitter_ip: Option<&str>,
        note: Option<&str>,
        rate_limit_per_ip: i64,
    ) -> Result<Option<SubmissionRow>> {
        let mut tx = self.pool().begin().await?;

        if let Some(ip) = submitter_ip {
            let recent = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM submissions
                WHERE submitter_ip = $1 AND created_at >= now() - interval '1 hour'
                "#,
            )
            .bind(ip)
            .fetch_one(&mut *tx)
            .await?;

            if recent >= rate_limit_per_ip {
                return Ok(None);
            }
        }

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO submissions (url, submitter_ip, note)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(url)
        .bind(submitter_ip)
        .bind(note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row))
    }

    pub async fn submission_by_id(&self, id: i64) -> Result<Option<SubmissionRow>> {
        let row = sqlx::query_as::<_, SubmissionRow>("SELECT * FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    /// Record the normalized URL and domain computed during processing.
    pub async fn set_submission_normalization(
        &self,
        id: i64,
        normalized_url: &str,
        domain: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE submissions SET normalized_url = $2, domain = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(normalized_url)
        .bind(domain)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn mark_submission_duplicate(
        &self,
        id: i64,
        variant_id: Option<i64>,
        cluster_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET status = 'duplicate', variant_id = $2, cluster_id = $3, processed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(variant_id)
        .bind(cluster_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn mark_submission_rejected(&self, id: i64, reason: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET status = 'rejected', rejection_reason = $2, processed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn mark_submission_published(&self, id: i64, raw_item_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET status = 'published', raw_item_id = $2, processed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(raw_item_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    // --- Candidate sources ---

    pub async fn candidate_source_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<CandidateSourceRow>> {
        let row = sqlx::query_as::<_, CandidateSourceRow>(
            "SELECT * FROM candidate_sources WHERE domain = $1",
        )
        .bind(domain)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Bump the submission counter on an already-known candidate domain.
    pub async fn record_candidate_submission(
        &self,
        domain: &str,
    ) -> Result<Option<CandidateSourceRow>> {
        let row = sqlx::query_as::<_, CandidateSourceRow>(
            r#"
            UPDATE candidate_sources
            SET times_submitted = times_submitted + 1, updated_at = now()
            WHERE domain = $1
            RETURNING *
            "#,
        )
        .bind(domain)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn create_candidate_source(
        &self,
        candidate: NewCandidateSource,
    ) -> Result<CandidateSourceRow> {
        let rss_success = candidate.discovered_feed_url.is_some();
        let row = sqlx::query_as::<_, CandidateSourceRow>(
            r#"
            INSERT INTO candidate_sources
                (domain, base_url, discovered_from_submission_id, suggested_category,
                 suggested_ingest_method, discovered_feed_url, rss_discovery_attempted,
                 rss_discovery_success, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'queued_for_review')
            RETURNING *
            "#,
        )
        .bind(&candidate.domain)
        .bind(&candidate.base_url)
        .bind(candidate.discovered_from_submission_id)
        .bind(candidate.suggested_category.map(|c| c.to_string()))
        .bind(candidate.suggested_ingest_method.map(|m| m.to_string()))
        .bind(&candidate.discovered_feed_url)
        .bind(candidate.rss_discovery_attempted)
        .bind(rss_success)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    /// Promote a reviewed candidate into an approved source.
    pub async fn approve_candidate_source(
        &self,
        candidate_id: i64,
        name: &str,
        category: SourceCategory,
        ingest_method: IngestMethod,
        reviewed_by: Option<&str>,
    ) -> Result<SourceRow> {
        let candidate = sqlx::query_as::<_, CandidateSourceRow>(
            "SELECT * FROM candidate_sources WHERE id = $1",
        )
        .bind(candidate_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| crate::error::StoreError::NotFound(format!("candidate {candidate_id}")))?;

        let source = self
            .insert_source(NewSource {
                name: name.to_string(),
                category,
                ingest_method,
                base_url: candidate.base_url.clone(),
                feed_url: candidate.discovered_feed_url.clone(),
                status: SourceStatus::Approved,
                priority: 100,
                metadata: serde_json::json!({}),
            })
            .await?;

        sqlx::query(
            r#"
            UPDATE candidate_sources
            SET status = 'approved', reviewed_at = now(), reviewed_by = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(candidate_id)
        .bind(reviewed_by)
        .execute(self.pool())
        .await?;

        Ok(source)
    }

    /// Submissions received in the window, for rate-limit inspection.
    pub async fn recent_submission_count(
        &self,
        submitter_ip: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM submissions WHERE submitter_ip = $1 AND created_at >= $2",
        )
        .bind(submitter_ip)
        .bind(since)
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }
}
