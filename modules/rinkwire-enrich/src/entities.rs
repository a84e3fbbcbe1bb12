//! Roster entity matching over title+description text.
//!
//! Full-name matches are always trusted. Last-name-only matches are easy to
//! get wrong (another player with the same surname, a reporter's byline), so
//! they must clear three hurdles: the surname is long enough, it is not a
//! common English word or surname, and the text carries topic context.

use rinkwire_store::EntityRow;

/// Last names that are also common English words or very common surnames.
/// These require a full-name match.
const COMMON_WORD_NAMES: &[&str] = &[
    // Common English words
    "white", "brown", "green", "black", "gray", "grey", "young", "king",
    "cook", "hill", "wood", "stone", "rice", "rose", "wolf", "fox",
    "burns", "powers", "waters", "fields", "banks", "cross", "church",
    "price", "best", "land", "day", "long", "strong", "power", "chase",
    // Very common surnames that match other people (reporters, other players)
    "smith", "johnson", "jones", "miller", "wilson", "moore", "taylor",
];

/// Minimum surname length for a last-name-only match.
const MIN_LAST_NAME_LEN: usize = 5;

/// Extract roster entity ids mentioned in the text.
///
/// Returns full-name matches first, then (when the text has topic context)
/// last-name-only matches, deduplicated in stable order.
pub fn extract_entities(roster: &[EntityRow], text: &str, topic_keywords: &[String]) -> Vec<i64> {
    let text_lower = text.to_lowercase();
    let has_topic_context = topic_keywords.iter().any(|kw| text_lower.contains(kw.as_str()));

    let mut full_matches = Vec::new();
    let mut last_name_matches = Vec::new();

    for entity in roster {
        let name_lower = entity.name.to_lowercase();

        if word_boundary_match(&name_lower, &text_lower) {
            full_matches.push(entity.id);
        } else if entity.name.contains(' ') {
            let last_name = match name_lower.split_whitespace().last() {
                Some(l) => l,
                None => continue,
            };
            if COMMON_WORD_NAMES.contains(&last_name) {
                continue;
            }
            if last_name.chars().count() >= MIN_LAST_NAME_LEN
                && word_boundary_match(last_name, &text_lower)
            {
                last_name_matches.push(entity.id);
            }
        }
    }

    // Last-name-only matches only count when the text mentions the topic.
    // This keeps "Skinner" in an unrelated recap from matching a rostered
    // Skinner.
    let mut out = full_matches;
    if has_topic_context {
        out.extend(last_name_matches);
    }

    let mut seen = std::collections::HashSet::new();
    out.retain(|id| seen.insert(*id));
    out
}

/// Filter to non-team entity ids, preserving order. Team entities are too
/// broad to discriminate between stories.
pub fn non_team_entity_ids(roster: &[EntityRow], entity_ids: &[i64]) -> Vec<i64> {
    entity_ids
        .iter()
        .copied()
        .filter(|id| {
            roster
                .iter()
                .find(|e| e.id == *id)
                .is_some_and(|e| !e.is_team())
        })
        .collect()
}

/// True when `term` appears in `text` bounded by start/end of string,
/// whitespace, or common punctuation. Hyphens are deliberately not
/// boundaries, which rejects slugged URL fragments like
/// "panarin-price-starts".
fn word_boundary_match(term: &str, text: &str) -> bool {
    if term.is_empty() {
        return false;
    }

    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find(term) {
        let start = search_from + pos;
        let end = start + term.len();

        let before_ok = start == 0
            || text[..start].chars().next_back().map(is_boundary_char).unwrap_or(true);
        let after_ok =
            end == text.len() || text[end..].chars().next().map(is_boundary_char).unwrap_or(true);

        if before_ok && after_ok {
            return true;
        }
        search_from = start + 1;
    }

    false
}

fn is_boundary_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '.' | ':' | ';' | '!' | '?' | '\'' | '"' | '(' | ')')
}
