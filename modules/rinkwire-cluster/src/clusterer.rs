//! Create-or-attach clustering over the store.

use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use rinkwire_common::Config;
use rinkwire_store::{NewCluster, Store, StoryVariantRow};

use crate::similarity::{
    composite_score, entity_overlap, event_compatibility, is_match, token_jaccard, window_hours,
    MatchThresholds,
};

/// Scores within this distance are ties; the earliest candidate (lowest id)
/// wins.
const SCORE_EPSILON: f64 = 1e-6;

pub struct Clusterer {
    store: Store,
    thresholds: MatchThresholds,
}

/// Outcome of assigning a variant.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAssignment {
    pub cluster_id: i64,
    /// True when a new cluster was opened for this variant.
    pub created: bool,
    pub similarity: f64,
}

impl Clusterer {
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store,
            thresholds: MatchThresholds {
                entity_overlap: config.entity_overlap_threshold,
                token_similarity: config.token_similarity_threshold,
                cluster_similarity: config.cluster_similarity_threshold,
            },
        }
    }

    /// Attach the variant to the best-matching active cluster inside the
    /// event-type window, or open a new cluster. `team_entity_ids` is the
    /// set of team entities to exclude from similarity comparisons;
    /// `tag_names` are the display tags assigned to the variant.
    ///
    /// There is no retroactive re-clustering; racing variants about the same
    /// event may open parallel clusters, remediated by the operator merge.
    pub async fn assign(
        &self,
        variant: &StoryVariantRow,
        tag_names: &[String],
        team_entity_ids: &HashSet<i64>,
    ) -> Result<ClusterAssignment> {
        let event = variant.event_type();
        let cutoff = Utc::now() - Duration::hours(window_hours(event));
        let candidates = self.store.candidate_clusters(cutoff).await?;

        let variant_clustering_entities: Vec<i64> = variant
            .entities
            .iter()
            .copied()
            .filter(|id| !team_entity_ids.contains(id))
            .collect();

        let mut best: Option<(i64, f64)> = None;

        for cluster in &candidates {
            let cluster_clustering_entities: Vec<i64> = cluster
                .entities_agg
                .iter()
                .copied()
                .filter(|id| !team_entity_ids.contains(id))
                .collect();

            let e = entity_overlap(&variant_clustering_entities, &cluster_clustering_entities);
            let t = token_jaccard(&variant.tokens, &cluster.tokens);
            let k = event_compatibility(event, cluster.event_type());
            let s = composite_score(e, t, k);

            debug!(
                cluster_id = cluster.id,
                e, t, k, s, "scored candidate cluster"
            );

            if is_match(
                e,
                t,
                s,
                !variant_clustering_entities.is_empty(),
                self.thresholds,
            ) && best.map_or(true, |(_, bs)| s > bs + SCORE_EPSILON)
            {
                best = Some((cluster.id, s));
            }
        }

        match best {
            Some((cluster_id, similarity)) => {
                self.attach(cluster_id, variant, tag_names, similarity).await?;
                info!(
                    variant_id = variant.id,
                    cluster_id, similarity, "variant attached to cluster"
                );
                Ok(ClusterAssignment {
                    cluster_id,
                    created: false,
                    similarity,
                })
            }
            None => {
                let cluster_id = self.create(variant, tag_names).await?;
                info!(variant_id = variant.id, cluster_id, "variant opened new cluster");
                Ok(ClusterAssignment {
                    cluster_id,
                    created: true,
                    similarity: 1.0,
                })
            }
        }
    }

    /// Attach path: link with the similarity recorded, union aggregates,
    /// recompute timestamps and source count, add association rows.
    /// The headline is never overwritten here.
    async fn attach(
        &self,
        cluster_id: i64,
        variant: &StoryVariantRow,
        tag_names: &[String],
        similarity: f64,
    ) -> Result<()> {
        self.store
            .link_variant_to_cluster(cluster_id, variant.id, Some(similarity))
            .await?;

        let cluster = self
            .store
            .cluster_by_id(cluster_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("cluster {cluster_id} vanished during attach"))?;

        let tokens: BTreeSet<String> = cluster
            .tokens
            .iter()
            .chain(variant.tokens.iter())
            .cloned()
            .collect();
        let entities: BTreeSet<i64> = cluster
            .entities_agg
            .iter()
            .chain(variant.entities.iter())
            .copied()
            .collect();

        self.store
            .update_cluster_aggregates(
                cluster_id,
                &tokens.into_iter().collect::<Vec<_>>(),
                &entities.into_iter().collect::<Vec<_>>(),
            )
            .await?;
        self.store.refresh_cluster_timestamps(cluster_id).await?;
        self.store.refresh_cluster_source_count(cluster_id).await?;

        self.associate(cluster_id, variant, tag_names).await
    }

    /// Create path: seed a cluster from the variant.
    async fn create(&self, variant: &StoryVariantRow, tag_names: &[String]) -> Result<i64> {
        let cluster = self
            .store
            .create_cluster(NewCluster {
                headline: variant.title.clone(),
                headline_source_signal: variant.source_signal,
                event_type: variant.event_type(),
                first_seen_at: variant.published_at,
                last_seen_at: variant.published_at,
                tokens: variant.tokens.clone(),
                entities_agg: variant.entities.clone(),
            })
            .await?;

        // Seed variant carries similarity 1.0.
        self.store
            .link_variant_to_cluster(cluster.id, variant.id, Some(1.0))
            .await?;

        self.associate(cluster.id, variant, tag_names).await?;

        Ok(cluster.id)
    }

    /// Idempotent ClusterEntity/ClusterTag rows for the variant.
    async fn associate(
        &self,
        cluster_id: i64,
        variant: &StoryVariantRow,
        tag_names: &[String],
    ) -> Result<()> {
        for entity_id in &variant.entities {
            self.store.add_cluster_entity(cluster_id, *entity_id).await?;
        }
        for name in tag_names {
            let tag = self.store.get_or_create_tag(name).await?;
            self.store.add_cluster_tag(cluster_id, tag.id).await?;
        }
        Ok(())
    }
}
