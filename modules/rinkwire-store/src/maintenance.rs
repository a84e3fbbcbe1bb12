//! Purge and feed-cache housekeeping.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::Result;
use crate::store::Store;

impl Store {
    /// Delete clusters not seen since the cutoff. Link rows cascade;
    /// submissions referencing them are nulled.
    pub async fn purge_old_clusters(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM clusters WHERE last_seen_at < $1")
            .bind(cutoff)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete raw items created before the cutoff. Story variants and their
    /// cluster links cascade.
    pub async fn purge_old_raw_items(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM raw_items WHERE created_at < $1")
            .bind(cutoff)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Run the daily 30-day purge and log what went away.
    pub async fn purge_older_than_days(&self, days: i64) -> Result<(u64, u64)> {
        let cutoff = Utc::now() - Duration::days(days);
        let clusters = self.purge_old_clusters(cutoff).await?;
        let raw_items = self.purge_old_raw_items(cutoff).await?;
        info!(clusters, raw_items, %cutoff, "purge complete");
        Ok((clusters, raw_items))
    }

    // --- Feed cache ---

    /// Fetch a cached payload if present and unexpired.
    pub async fn cache_get(&self, cache_key: &str) -> Result<Option<serde_json::Value>> {
        let payload = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT payload FROM feed_cache WHERE cache_key = $1 AND expires_at > now()",
        )
        .bind(cache_key)
        .fetch_optional(self.pool())
        .await?;

        Ok(payload)
    }

    pub async fn cache_put(
        &self,
        cache_key: &str,
        payload: &serde_json::Value,
        ttl: Duration,
    ) -> Result<()> {
        let expires_at = Utc::now() + ttl;
        sqlx::query(
            r#"
            INSERT INTO feed_cache (cache_key, payload, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (cache_key) DO UPDATE
                SET payload = EXCLUDED.payload, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(cache_key)
        .bind(payload)
        .bind(expires_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn cleanup_expired_cache(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM feed_cache WHERE expires_at < now()")
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
