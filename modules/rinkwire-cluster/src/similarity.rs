//! Composite similarity scoring between a variant and a candidate cluster.

use std::collections::HashSet;

use rinkwire_common::EventType;

/// Component weights of the composite score.
const ENTITY_WEIGHT: f64 = 0.55;
const TOKEN_WEIGHT: f64 = 0.35;
const EVENT_WEIGHT: f64 = 0.10;

/// Event pairs considered related enough for partial credit.
const COMPATIBLE_EVENTS: &[(EventType, EventType)] = &[
    (EventType::Trade, EventType::Signing),
    (EventType::Lineup, EventType::Game),
    (EventType::Lineup, EventType::Recall),
];

/// Thresholds for the two-gate match rule.
#[derive(Debug, Clone, Copy)]
pub struct MatchThresholds {
    pub entity_overlap: f64,
    pub token_similarity: f64,
    pub cluster_similarity: f64,
}

/// Entity overlap: `|a ∩ b| / max(|a|, |b|)`.
///
/// The max denominator keeps large clusters (a game thread carrying the
/// whole roster) from matching unrelated articles that share a couple of
/// names.
pub fn entity_overlap(variant_entities: &[i64], cluster_entities: &[i64]) -> f64 {
    if variant_entities.is_empty() || cluster_entities.is_empty() {
        return 0.0;
    }

    let set_v: HashSet<i64> = variant_entities.iter().copied().collect();
    let set_c: HashSet<i64> = cluster_entities.iter().copied().collect();
    let intersection = set_v.intersection(&set_c).count();
    let denominator = set_v.len().max(set_c.len());

    intersection as f64 / denominator as f64
}

/// Token Jaccard: `|a ∩ b| / max(1, |a ∪ b|)`.
pub fn token_jaccard(variant_tokens: &[String], cluster_tokens: &[String]) -> f64 {
    if variant_tokens.is_empty() || cluster_tokens.is_empty() {
        return 0.0;
    }

    let set_v: HashSet<&str> = variant_tokens.iter().map(String::as_str).collect();
    let set_c: HashSet<&str> = cluster_tokens.iter().map(String::as_str).collect();
    let intersection = set_v.intersection(&set_c).count();
    let union = set_v.union(&set_c).count();

    intersection as f64 / union.max(1) as f64
}

/// Event compatibility: 1.0 on exact match, 0.5 for related pairs, else 0.
pub fn event_compatibility(variant_event: EventType, cluster_event: EventType) -> f64 {
    if variant_event == cluster_event {
        return 1.0;
    }
    let related = COMPATIBLE_EVENTS.iter().any(|(a, b)| {
        (*a == variant_event && *b == cluster_event) || (*a == cluster_event && *b == variant_event)
    });
    if related {
        0.5
    } else {
        0.0
    }
}

/// `S = 0.55·E + 0.35·T + 0.10·K`
pub fn composite_score(entity: f64, token: f64, event: f64) -> f64 {
    ENTITY_WEIGHT * entity + TOKEN_WEIGHT * token + EVENT_WEIGHT * event
}

/// The two conjunctive gates a candidate must pass:
/// entity gate (E when the variant has non-team entities, T otherwise) and
/// the composite score gate.
pub fn is_match(
    entity_score: f64,
    token_score: f64,
    composite: f64,
    variant_has_entities: bool,
    thresholds: MatchThresholds,
) -> bool {
    let entity_gate = if variant_has_entities {
        entity_score >= thresholds.entity_overlap
    } else {
        token_score >= thresholds.token_similarity
    };

    entity_gate && composite >= thresholds.cluster_similarity
}

/// Candidate time window per event type. Games collapse into a day, hot
/// takes into half of one; everything transactional gets three days.
pub fn window_hours(event: EventType) -> i64 {
    match event {
        EventType::Game => 24,
        EventType::Opinion => 12,
        EventType::Trade
        | EventType::Injury
        | EventType::Lineup
        | EventType::Recall
        | EventType::Waiver
        | EventType::Signing
        | EventType::Prospect
        | EventType::Other => 72,
    }
}
