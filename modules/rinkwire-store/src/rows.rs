//! Row structs mapped 1:1 onto the relational schema.
//!
//! Enum-valued columns are stored as TEXT; accessors parse into the shared
//! enums, falling back to the schema default when a row predates an enum
//! change.

use chrono::{DateTime, Utc};
use rinkwire_common::{
    ClusterStatus, ContentType, EventType, IngestMethod, SourceCategory, SourceStatus,
    SubmissionStatus, VariantStatus,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub ingest_method: String,
    pub base_url: String,
    pub feed_url: Option<String>,
    pub status: String,
    pub priority: i32,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub fetch_error_count: i32,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceRow {
    pub fn category(&self) -> SourceCategory {
        self.category.parse().unwrap_or(SourceCategory::Other)
    }

    pub fn ingest_method(&self) -> Option<IngestMethod> {
        self.ingest_method.parse().ok()
    }

    pub fn status(&self) -> SourceStatus {
        self.status.parse().unwrap_or(SourceStatus::Candidate)
    }

    pub fn source_signal(&self) -> i32 {
        self.category().source_signal()
    }

    /// True when a boolean flag is set in the source's metadata map.
    pub fn metadata_flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntityRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub entity_type: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl EntityRow {
    pub fn is_team(&self) -> bool {
        self.entity_type == rinkwire_common::ENTITY_TYPE_TEAM
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub display_color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawItemRow {
    pub id: i64,
    pub source_id: i64,
    pub source_item_id: Option<String>,
    pub ingestion_origin: String,
    pub original_url: String,
    pub canonical_url: Option<String>,
    pub raw_title: Option<String>,
    pub raw_description: Option<String>,
    pub raw_content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub ingest_hash: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl RawItemRow {
    /// Best available display title.
    pub fn display_title(&self) -> &str {
        self.raw_title
            .as_deref()
            .or(self.raw_description.as_deref())
            .unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoryVariantRow {
    pub id: i64,
    pub raw_item_id: i64,
    pub source_id: i64,
    pub url: String,
    pub title: String,
    pub content_type: String,
    pub published_at: DateTime<Utc>,
    pub tokens: Vec<String>,
    pub entities: Vec<i64>,
    pub event_type: String,
    pub source_signal: i32,
    pub status: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl StoryVariantRow {
    pub fn event_type(&self) -> EventType {
        self.event_type.parse().unwrap_or(EventType::Other)
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type.parse().unwrap_or(ContentType::Article)
    }

    pub fn status(&self) -> VariantStatus {
        self.status.parse().unwrap_or(VariantStatus::Active)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClusterRow {
    pub id: i64,
    pub headline: String,
    pub headline_source_signal: i32,
    pub event_type: String,
    pub status: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub tokens: Vec<String>,
    pub entities_agg: Vec<i64>,
    pub source_count: i32,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClusterRow {
    pub fn event_type(&self) -> EventType {
        self.event_type.parse().unwrap_or(EventType::Other)
    }

    pub fn status(&self) -> ClusterStatus {
        self.status.parse().unwrap_or(ClusterStatus::Active)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClusterVariantRow {
    pub id: i64,
    pub cluster_id: i64,
    pub variant_id: i64,
    pub similarity_score: Option<f64>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub url: String,
    pub normalized_url: Option<String>,
    pub domain: Option<String>,
    pub note: Option<String>,
    pub submitter_ip: Option<String>,
    pub status: String,
    pub raw_item_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub cluster_id: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl SubmissionRow {
    pub fn status(&self) -> SubmissionStatus {
        self.status.parse().unwrap_or(SubmissionStatus::Received)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateSourceRow {
    pub id: i64,
    pub domain: String,
    pub base_url: String,
    pub discovered_from_submission_id: Option<i64>,
    pub suggested_category: Option<String>,
    pub suggested_ingest_method: Option<String>,
    pub discovered_feed_url: Option<String>,
    pub rss_discovery_attempted: bool,
    pub rss_discovery_success: bool,
    pub times_submitted: i32,
    pub status: String,
    pub evidence: serde_json::Value,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ValidationLogRow {
    pub id: i64,
    pub raw_item_id: i64,
    pub method: String,
    pub result: String,
    pub llm_response: Option<String>,
    pub llm_model: Option<String>,
    pub keyword_matched: Option<bool>,
    pub entities_found: serde_json::Value,
    pub reason: Option<String>,
    pub latency_ms: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedCacheRow {
    pub id: i64,
    pub cache_key: String,
    pub payload: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
