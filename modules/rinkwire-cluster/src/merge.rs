//! Operator merge tool. The clusterer never re-clusters retroactively, so
//! racing variants can open parallel clusters about one event; this is the
//! designated remediation.

use anyhow::{bail, Result};
use tracing::info;

use rinkwire_store::{ClusterRow, Store};

/// Merge clusters into the first id in the list. All variants, tags, and
/// entities from the remaining clusters are repointed to the target
/// (duplicates on the unique pairs dropped), tokens and entity aggregates
/// unioned, the seen range extended, source_count recomputed, and the
/// source clusters deleted.
pub async fn merge_clusters(store: &Store, cluster_ids: &[i64]) -> Result<ClusterRow> {
    if cluster_ids.len() < 2 {
        bail!("need at least 2 cluster ids to merge");
    }

    let target_id = cluster_ids[0];
    let source_ids = &cluster_ids[1..];

    if source_ids.contains(&target_id) {
        bail!("target cluster {target_id} repeated in source list");
    }

    let merged = store.merge_clusters(target_id, source_ids).await?;

    info!(
        target_id,
        merged_from = ?source_ids,
        source_count = merged.source_count,
        "clusters merged"
    );

    Ok(merged)
}
