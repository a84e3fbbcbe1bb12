//! Clusters, their join tables, the operator merge, and the read-side
//! queries the feed API consumes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use rinkwire_common::EventType;

use crate::error::{Result, StoreError};
use crate::rows::{ClusterRow, ClusterVariantRow, EntityRow, StoryVariantRow, TagRow};
use crate::store::Store;

pub struct NewCluster {
    pub headline: String,
    pub headline_source_signal: i32,
    pub event_type: EventType,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub tokens: Vec<String>,
    pub entities_agg: Vec<i64>,
}

impl Store {
    /// Active clusters opened within the candidate window.
    pub async fn candidate_clusters(&self, cutoff: DateTime<Utc>) -> Result<Vec<ClusterRow>> {
        let rows = sqlx::query_as::<_, ClusterRow>(
            r#"
            SELECT * FROM clusters
            WHERE status = 'active' AND first_seen_at >= $1
            ORDER BY id ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn cluster_by_id(&self, id: i64) -> Result<Option<ClusterRow>> {
        let row = sqlx::query_as::<_, ClusterRow>("SELECT * FROM clusters WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    pub async fn create_cluster(&self, cluster: NewCluster) -> Result<ClusterRow> {
        let row = sqlx::query_as::<_, ClusterRow>(
            r#"
            INSERT INTO clusters
                (headline, headline_source_signal, event_type, first_seen_at, last_seen_at,
                 tokens, entities_agg, source_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
            RETURNING *
            "#,
        )
        .bind(&cluster.headline)
        .bind(cluster.headline_source_signal)
        .bind(cluster.event_type.to_string())
        .bind(cluster.first_seen_at)
        .bind(cluster.last_seen_at)
        .bind(&cluster.tokens)
        .bind(&cluster.entities_agg)
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    /// Link a variant to a cluster with the similarity recorded at attach
    /// time. Idempotent on the (cluster, variant) pair; returns whether a new
    /// link row was created.
    pub async fn link_variant_to_cluster(
        &self,
        cluster_id: i64,
        variant_id: i64,
        similarity_score: Option<f64>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO cluster_variants (cluster_id, variant_id, similarity_score)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT uq_cluster_variant DO NOTHING
            "#,
        )
        .bind(cluster_id)
        .bind(variant_id)
        .bind(similarity_score)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the aggregated token/entity arrays (caller computes unions).
    pub async fn update_cluster_aggregates(
        &self,
        cluster_id: i64,
        tokens: &[String],
        entities_agg: &[i64],
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE clusters
            SET tokens = $2, entities_agg = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(cluster_id)
        .bind(tokens)
        .bind(entities_agg)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Recompute first/last seen from the union of member variant publish
    /// timestamps.
    pub async fn refresh_cluster_timestamps(&self, cluster_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE clusters c
            SET first_seen_at = m.min_published,
                last_seen_at = m.max_published,
                updated_at = now()
            FROM (
                SELECT MIN(v.published_at) AS min_published,
                       MAX(v.published_at) AS max_published
                FROM story_variants v
                JOIN cluster_variants cv ON cv.variant_id = v.id
                WHERE cv.cluster_id = $1
            ) m
            WHERE c.id = $1 AND m.min_published IS NOT NULL
            "#,
        )
        .bind(cluster_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Recompute the cached variant count from the link table.
    pub async fn refresh_cluster_source_count(&self, cluster_id: i64) -> Result<i32> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE clusters
            SET source_count = (SELECT COUNT(*) FROM cluster_variants WHERE cluster_id = $1),
                updated_at = now()
            WHERE id = $1
            RETURNING source_count
            "#,
        )
        .bind(cluster_id)
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }

    /// Associate an entity with a cluster (idempotent).
    pub async fn add_cluster_entity(&self, cluster_id: i64, entity_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cluster_entities (cluster_id, entity_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT uq_cluster_entity DO NOTHING
            "#,
        )
        .bind(cluster_id)
        .bind(entity_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Associate a tag with a cluster (idempotent).
    pub async fn add_cluster_tag(&self, cluster_id: i64, tag_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cluster_tags (cluster_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT uq_cluster_tag DO NOTHING
            "#,
        )
        .bind(cluster_id)
        .bind(tag_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn cluster_variant_links(&self, cluster_id: i64) -> Result<Vec<ClusterVariantRow>> {
        let rows = sqlx::query_as::<_, ClusterVariantRow>(
            "SELECT * FROM cluster_variants WHERE cluster_id = $1 ORDER BY added_at ASC",
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    // --- Operator merge ---

    /// Merge source clusters into the target: repoint variants, tags, and
    /// entities (dropping duplicates on the unique pairs), union tokens and
    /// entity aggregates, extend the seen range, recompute source_count, and
    /// delete the source clusters. One transaction.
    pub async fn merge_clusters(&self, target_id: i64, source_ids: &[i64]) -> Result<ClusterRow> {
        let mut tx = self.pool().begin().await?;

        let mut all_ids = vec![target_id];
        all_ids.extend_from_slice(source_ids);

        let members = sqlx::query_as::<_, ClusterRow>(
            "SELECT * FROM clusters WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(&all_ids)
        .fetch_all(&mut *tx)
        .await?;

        for id in &all_ids {
            if !members.iter().any(|c| c.id == *id) {
                return Err(StoreError::NotFound(format!("cluster {id}")));
            }
        }

        // Repoint link rows, dropping rows that would violate the unique pair.
        for table in ["cluster_variants", "cluster_tags", "cluster_entities"] {
            let other_key = match table {
                "cluster_variants" => "variant_id",
                "cluster_tags" => "tag_id",
                _ => "entity_id",
            };
            let repoint = format!(
                r#"
                UPDATE {table} src
                SET cluster_id = $1
                WHERE src.cluster_id = ANY($2)
                  AND NOT EXISTS (
                      SELECT 1 FROM {table} dst
                      WHERE dst.cluster_id = $1 AND dst.{other_key} = src.{other_key}
                  )
                "#
            );
            sqlx::query(&repoint)
                .bind(target_id)
                .bind(source_ids)
                .execute(&mut *tx)
                .await?;

            let drop_dupes = format!("DELETE FROM {table} WHERE cluster_id = ANY($1)");
            sqlx::query(&drop_dupes)
                .bind(source_ids)
                .execute(&mut *tx)
                .await?;
        }

        // Union metadata across all members. BTreeSet keeps the arrays
        // deterministic.
        let first_seen = members.iter().map(|c| c.first_seen_at).min();
        let last_seen = members.iter().map(|c| c.last_seen_at).max();
        let tokens: BTreeSet<String> = members.iter().flat_map(|c| c.tokens.clone()).collect();
        let entities: BTreeSet<i64> = members.iter().flat_map(|c| c.entities_agg.clone()).collect();
        let tokens: Vec<String> = tokens.into_iter().collect();
        let entities: Vec<i64> = entities.into_iter().collect();

        sqlx::query(
            r#"
            UPDATE clusters
            SET first_seen_at = $2,
                last_seen_at = $3,
                tokens = $4,
                entities_agg = $5,
                source_count = (SELECT COUNT(*) FROM cluster_variants WHERE cluster_id = $1),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(target_id)
        .bind(first_seen)
        .bind(last_seen)
        .bind(&tokens)
        .bind(&entities)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM clusters WHERE id = ANY($1)")
            .bind(source_ids)
            .execute(&mut *tx)
            .await?;

        let merged = sqlx::query_as::<_, ClusterRow>("SELECT * FROM clusters WHERE id = $1")
            .bind(target_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(merged)
    }

    // --- Read side (consumed by the external feed API) ---

    /// Active clusters, most recently seen first.
    pub async fn feed_clusters(&self, limit: i64, offset: i64) -> Result<Vec<ClusterRow>> {
        let rows = sqlx::query_as::<_, ClusterRow>(
            r#"
            SELECT * FROM clusters
            WHERE status = 'active'
            ORDER BY last_seen_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// A cluster's variants ordered by source signal (official > press >
    /// other), then recency.
    pub async fn cluster_variants_ordered(&self, cluster_id: i64) -> Result<Vec<StoryVariantRow>> {
        let rows = sqlx::query_as::<_, StoryVariantRow>(
            r#"
            SELECT v.* FROM story_variants v
            JOIN cluster_variants cv ON cv.variant_id = v.id
            WHERE cv.cluster_id = $1
            ORDER BY v.source_signal DESC, v.published_at DESC
            "#,
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn cluster_tag_rows(&self, cluster_id: i64) -> Result<Vec<TagRow>> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.* FROM tags t
            JOIN cluster_tags ct ON ct.tag_id = t.id
            WHERE ct.cluster_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn cluster_entity_rows(&self, cluster_id: i64) -> Result<Vec<EntityRow>> {
        let rows = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT e.* FROM entities e
            JOIN cluster_entities ce ON ce.entity_id = e.id
            WHERE ce.cluster_id = $1
            ORDER BY e.name ASC
            "#,
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn increment_click_count(&self, cluster_id: i64) -> Result<()> {
        sqlx::query("UPDATE clusters SET click_count = click_count + 1 WHERE id = $1")
            .bind(cluster_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
