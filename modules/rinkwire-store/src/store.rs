use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use rinkwire_common::{slugify, IngestMethod, SourceCategory, SourceStatus};

use crate::error::{Result, StoreError};
use crate::rows::{EntityRow, SourceRow, TagRow};

/// Metadata key marking the reserved user-submissions source.
const USER_SUBMISSIONS_KEY: &str = "user-submissions";

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

/// Parameters for inserting a new source (seeding, candidate approval).
pub struct NewSource {
    pub name: String,
    pub category: SourceCategory,
    pub ingest_method: IngestMethod,
    pub base_url: String,
    pub feed_url: Option<String>,
    pub status: SourceStatus,
    pub priority: i32,
    pub metadata: serde_json::Value,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // --- Sources ---

    /// All approved sources. Only approved sources participate in the
    /// scheduled fetch; which of them actually get a fetch task is the
    /// scheduler's policy.
    pub async fn approved_sources(&self) -> Result<Vec<SourceRow>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            "SELECT * FROM sources WHERE status = 'approved' ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn source_by_id(&self, id: i64) -> Result<Option<SourceRow>> {
        let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// The reserved source that owns user-submitted raw items.
    pub async fn user_submission_source(&self) -> Result<SourceRow> {
        sqlx::query_as::<_, SourceRow>("SELECT * FROM sources WHERE metadata->>'key' = $1")
            .bind(USER_SUBMISSIONS_KEY)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("user-submissions source".to_string()))
    }

    pub async fn insert_source(&self, source: NewSource) -> Result<SourceRow> {
        let row = sqlx::query_as::<_, SourceRow>(
            r#"
            INSERT INTO sources (name, category, ingest_method, base_url, feed_url, status, priority, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&source.name)
        .bind(source.category.to_string())
        .bind(source.ingest_method.to_string())
        .bind(&source.base_url)
        .bind(&source.feed_url)
        .bind(source.status.to_string())
        .bind(source.priority)
        .bind(&source.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Record a successful fetch: stamp last_fetched_at, zero the error
    /// counter.
    pub async fn mark_fetch_success(&self, source_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sources
            SET last_fetched_at = now(), fetch_error_count = 0, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(source_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed fetch: bump the consecutive error counter.
    pub async fn mark_fetch_failure(&self, source_id: i64) -> Result<i32> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE sources
            SET fetch_error_count = fetch_error_count + 1, updated_at = now()
            WHERE id = $1
            RETURNING fetch_error_count
            "#,
        )
        .bind(source_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // --- Entities ---

    pub async fn all_entities(&self) -> Result<Vec<EntityRow>> {
        let rows = sqlx::query_as::<_, EntityRow>("SELECT * FROM entities ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Insert or refresh an entity keyed by its slug (slug is a pure
    /// function of the name). Existing entities get their metadata updated.
    pub async fn upsert_entity(
        &self,
        name: &str,
        entity_type: &str,
        metadata: serde_json::Value,
    ) -> Result<EntityRow> {
        let slug = slugify(name);
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            INSERT INTO entities (name, slug, entity_type, metadata)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE SET metadata = EXCLUDED.metadata
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(&slug)
        .bind(entity_type)
        .bind(&metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Delete non-team entities whose slug is not in the current roster set.
    /// ClusterEntity rows cascade. Departure pruning prevents false-positive
    /// matches on ex-players.
    pub async fn prune_departed_entities(&self, keep_slugs: &[String]) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM entities
            WHERE entity_type <> 'team' AND NOT (slug = ANY($1))
            "#,
        )
        .bind(keep_slugs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // --- Tags ---

    /// Get or lazily create a tag by name; slug is derived from the name.
    pub async fn get_or_create_tag(&self, name: &str) -> Result<TagRow> {
        let slug = slugify(name);
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET name = tags.name
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(&slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    // --- Metrics ---

    pub async fn increment_metric(&self, key: &str, delta: i64) -> Result<i64> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO site_metrics (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
                SET value = site_metrics.value + EXCLUDED.value, updated_at = now()
            RETURNING value
            "#,
        )
        .bind(key)
        .bind(delta)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    pub async fn metric_value(&self, key: &str) -> Result<i64> {
        let value =
            sqlx::query_scalar::<_, i64>("SELECT value FROM site_metrics WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.unwrap_or(0))
    }
}
