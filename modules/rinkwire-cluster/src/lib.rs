//! Online clustering: attach each new story variant to the best-matching
//! active cluster, or open a new one.

pub mod clusterer;
pub mod merge;
pub mod similarity;

pub use clusterer::{ClusterAssignment, Clusterer};
pub use merge::merge_clusters;
pub use similarity::{
    composite_score, entity_overlap, event_compatibility, is_match, token_jaccard, window_hours,
    MatchThresholds,
};
