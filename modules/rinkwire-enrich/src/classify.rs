//! Keyword-scored event classification and multi-tag assignment.

use rinkwire_common::{EventType, SourceCategory};

/// Event keyword dictionary in tie-break order: when two categories score
/// the same hit count, the one listed first wins.
const EVENT_KEYWORDS: &[(EventType, &[&str])] = &[
    (EventType::Trade, &["trade", "traded", "acquire", "acquired", "dealt"]),
    (
        EventType::Injury,
        &["injury", "injured", "injured reserve", "day-to-day", "out indefinitely", "week-to-week"],
    ),
    (EventType::Lineup, &["lineup", "lines", "starting", "scratched", "scratch"]),
    (EventType::Recall, &["recall", "recalled", "call up", "called up", "promote"]),
    (EventType::Waiver, &["waiver", "waivers", "claimed", "claim"]),
    (
        EventType::Signing,
        &["sign", "signed", "contract", "extension", "agree to terms"],
    ),
    (
        EventType::Prospect,
        &["prospect", "draft", "drafted", "junior", "development"],
    ),
    (
        EventType::Game,
        &[
            "game", "win", "loss", "score", "final", "vs", "defeat", "beat", "period", "goal",
            "assist", "shutout", "overtime", "recap",
        ],
    ),
    (
        EventType::Opinion,
        &["think", "believe", "opinion", "analysis", "why", "should"],
    ),
];

/// Display names for event-derived tags.
const EVENT_TAG_NAMES: &[(EventType, &str)] = &[
    (EventType::Trade, "Trade"),
    (EventType::Injury, "Injury"),
    (EventType::Lineup, "Lineup"),
    (EventType::Recall, "Recall"),
    (EventType::Waiver, "Waiver"),
    (EventType::Signing, "Signing"),
    (EventType::Prospect, "Prospect"),
    (EventType::Game, "Game"),
    (EventType::Opinion, "Opinion"),
];

/// Rumor-language phrases. Combined with a press source they produce the
/// Rumors tag.
const RUMOR_PHRASES: &[&str] = &[
    "hearing", "sources say", "linked to", "in talks", "rumor", "reportedly",
];

const AFFILIATE_KEYWORD: &str = "barracuda";
const AFFILIATE_URL_SLUG: &str = "sjbarracuda";

/// Hit counts per event category, in dictionary order, categories with zero
/// hits omitted.
pub fn count_event_keyword_matches(text_lower: &str) -> Vec<(EventType, usize)> {
    EVENT_KEYWORDS
        .iter()
        .filter_map(|(event, keywords)| {
            let count = keywords.iter().filter(|kw| text_lower.contains(*kw)).count();
            (count > 0).then_some((*event, count))
        })
        .collect()
}

/// Classify the primary event type: the category with the most keyword
/// hits; ties resolve by dictionary order; no hits at all means `other`.
pub fn classify_event_type(text: &str) -> EventType {
    let text_lower = text.to_lowercase();
    let scores = count_event_keyword_matches(&text_lower);

    // First maximum wins: scores are in dictionary order, so a strictly
    // greater count is required to displace an earlier category.
    let mut best: Option<(EventType, usize)> = None;
    for (event, count) in scores {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((event, count));
        }
    }

    best.map(|(event, _)| event).unwrap_or(EventType::Other)
}

/// Assign display tags to a variant. Every event category with at least one
/// title hit contributes its tag; affiliate, rumor, and official tags are
/// rule-based on top.
pub fn assign_tags(title: &str, url: &str, source_category: SourceCategory) -> Vec<String> {
    let title_lower = title.to_lowercase();
    let url_lower = url.to_lowercase();

    let mut tags: Vec<String> = Vec::new();

    let matches = count_event_keyword_matches(&title_lower);
    for (event, name) in EVENT_TAG_NAMES {
        if matches.iter().any(|(e, _)| e == event) {
            tags.push((*name).to_string());
        }
    }

    if title_lower.contains(AFFILIATE_KEYWORD) || url_lower.contains(AFFILIATE_URL_SLUG) {
        tags.push("Barracuda".to_string());
    }

    let has_rumor_language = RUMOR_PHRASES.iter().any(|p| title_lower.contains(p));
    if has_rumor_language && source_category == SourceCategory::Press {
        tags.push("Rumors".to_string());
    }

    if source_category == SourceCategory::Official {
        tags.push("Official".to_string());
    }

    tags
}
