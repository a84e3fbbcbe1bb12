//! Raw items, story variants, and validation logs.

use chrono::{DateTime, Utc};

use rinkwire_common::{ContentType, EventType, ValidationMethod, ValidationResult};

use crate::error::{is_unique_violation, Result};
use crate::rows::{RawItemRow, StoryVariantRow};
use crate::store::Store;

/// Parameters for inserting a raw item. `canonical_url` and `ingest_hash`
/// are precomputed by the caller from the original URL.
pub struct NewRawItem {
    pub source_id: i64,
    pub source_item_id: Option<String>,
    pub ingestion_origin: String,
    pub original_url: String,
    pub canonical_url: String,
    pub ingest_hash: String,
    pub raw_title: Option<String>,
    pub raw_description: Option<String>,
    pub raw_content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

pub struct NewStoryVariant {
    pub raw_item_id: i64,
    pub source_id: i64,
    pub url: String,
    pub title: String,
    pub content_type: ContentType,
    pub published_at: DateTime<Utc>,
    pub tokens: Vec<String>,
    pub entities: Vec<i64>,
    pub event_type: EventType,
    pub source_signal: i32,
}

/// One audit row per relevance decision.
pub struct NewValidationLog {
    pub raw_item_id: i64,
    pub method: ValidationMethod,
    pub result: ValidationResult,
    pub llm_response: Option<String>,
    pub llm_model: Option<String>,
    pub keyword_matched: Option<bool>,
    pub entities_found: Vec<i64>,
    pub reason: Option<String>,
    pub latency_ms: Option<i32>,
    pub error_message: Option<String>,
}

impl Store {
    /// Create a raw item with idempotency checks, in one transaction.
    /// Dedup probes, in order: (source_id, source_item_id), canonical_url,
    /// ingest_hash. Returns `None` when any probe hits (duplicate).
    pub async fn create_raw_item(&self, item: NewRawItem) -> Result<Option<RawItemRow>> {
        let mut tx = self.pool().begin().await?;

        if let Some(source_item_id) = &item.source_item_id {
            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM raw_items WHERE source_id = $1 AND source_item_id = $2 LIMIT 1",
            )
            .bind(item.source_id)
            .bind(source_item_id)
            .fetch_optional(&mut *tx)
            .await?;
            if existing.is_some() {
                return Ok(None);
            }
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM raw_items WHERE canonical_url = $1 LIMIT 1",
        )
        .bind(&item.canonical_url)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT id FROM raw_items WHERE ingest_hash = $1 LIMIT 1")
                .bind(&item.ingest_hash)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, RawItemRow>(
            r#"
            INSERT INTO raw_items
                (source_id, source_item_id, ingestion_origin, original_url, canonical_url,
                 ingest_hash, raw_title, raw_description, raw_content, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(item.source_id)
        .bind(&item.source_item_id)
        .bind(&item.ingestion_origin)
        .bind(&item.original_url)
        .bind(&item.canonical_url)
        .bind(&item.ingest_hash)
        .bind(&item.raw_title)
        .bind(&item.raw_description)
        .bind(&item.raw_content)
        .bind(item.published_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row))
    }

    pub async fn raw_item_by_id(&self, id: i64) -> Result<Option<RawItemRow>> {
        let row = sqlx::query_as::<_, RawItemRow>("SELECT * FROM raw_items WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    /// Insert a story variant. The URL is globally unique; a constraint race
    /// (two enrichments of the same URL) resolves to `None`, the duplicate
    /// path.
    pub async fn create_story_variant(
        &self,
        variant: NewStoryVariant,
    ) -> Result<Option<StoryVariantRow>> {
        let result = sqlx::query_as::<_, StoryVariantRow>(
            r#"
            INSERT INTO story_variants
                (raw_item_id, source_id, url, title, content_type, published_at,
                 tokens, entities, event_type, source_signal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(variant.raw_item_id)
        .bind(variant.source_id)
        .bind(&variant.url)
        .bind(&variant.title)
        .bind(variant.content_type.to_string())
        .bind(variant.published_at)
        .bind(&variant.tokens)
        .bind(&variant.entities)
        .bind(variant.event_type.to_string())
        .bind(variant.source_signal)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(row) => Ok(Some(row)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn variant_by_url(&self, url: &str) -> Result<Option<StoryVariantRow>> {
        let row = sqlx::query_as::<_, StoryVariantRow>("SELECT * FROM story_variants WHERE url = $1")
            .bind(url)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    /// The cluster a variant is linked to, if any.
    pub async fn variant_cluster_id(&self, variant_id: i64) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT cluster_id FROM cluster_variants WHERE variant_id = $1 LIMIT 1",
        )
        .bind(variant_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(id)
    }

    pub async fn insert_validation_log(&self, log: NewValidationLog) -> Result<()> {
        let entities_json =
            serde_json::to_value(&log.entities_found).unwrap_or(serde_json::Value::Array(vec![]));

        sqlx::query(
            r#"
            INSERT INTO validation_logs
                (raw_item_id, method, result, llm_response, llm_model, keyword_matched,
                 entities_found, reason, latency_ms, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(log.raw_item_id)
        .bind(log.method.to_string())
        .bind(log.result.to_string())
        .bind(&log.llm_response)
        .bind(&log.llm_model)
        .bind(log.keyword_matched)
        .bind(&entities_json)
        .bind(&log.reason)
        .bind(log.latency_ms)
        .bind(&log.error_message)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn validation_logs_for_item(
        &self,
        raw_item_id: i64,
    ) -> Result<Vec<crate::rows::ValidationLogRow>> {
        let rows = sqlx::query_as::<_, crate::rows::ValidationLogRow>(
            "SELECT * FROM validation_logs WHERE raw_item_id = $1 ORDER BY created_at ASC",
        )
        .bind(raw_item_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
