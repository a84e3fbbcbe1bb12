//! Roster sync: refresh the player entity set from the upstream roster page
//! and prune departed members.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use rinkwire_common::slugify;
use rinkwire_store::Store;

use crate::error::{IngestError, Result};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-6][^>]*>(.*?)</h[1-6]>").expect("valid regex"));

static ANCHOR_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a[^>]*>([^<]+)</a>").expect("valid regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));

/// Player names parsed out of the roster document, by section.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedRoster {
    pub active: Vec<String>,
    pub non_roster: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RosterStats {
    pub active: usize,
    pub non_roster: usize,
    pub pruned: u64,
}

pub struct RosterSync {
    http: reqwest::Client,
    store: Store,
}

impl RosterSync {
    pub fn new(store: Store, http: reqwest::Client) -> Self {
        Self { http, store }
    }

    /// Fetch the roster page, upsert every player found in the active and
    /// non-roster sections, then delete non-team entities that are no
    /// longer on the roster (their cluster associations go with them).
    pub async fn sync(&self, roster_url: &str) -> Result<RosterStats> {
        info!(roster_url, "roster sync starting");

        let response = self
            .http
            .get(roster_url)
            .send()
            .await
            .map_err(|e| IngestError::FetchFailed(format!("{roster_url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::FetchFailed(format!(
                "{roster_url}: HTTP {status}"
            )));
        }
        let html = response
            .text()
            .await
            .map_err(|e| IngestError::FetchFailed(format!("{roster_url}: {e}")))?;

        let roster = parse_roster(&html);
        if roster.active.is_empty() && roster.non_roster.is_empty() {
            return Err(IngestError::FetchFailed(format!(
                "{roster_url}: no player names recovered"
            )));
        }

        let mut keep_slugs: Vec<String> = Vec::new();

        for (section, names) in [("active", &roster.active), ("non_roster", &roster.non_roster)] {
            for name in names {
                let entity = self
                    .store
                    .upsert_entity(
                        name,
                        rinkwire_common::ENTITY_TYPE_PLAYER,
                        serde_json::json!({ "roster_section": section }),
                    )
                    .await?;
                keep_slugs.push(entity.slug);
            }
        }

        let pruned = self.store.prune_departed_entities(&keep_slugs).await?;
        if pruned > 0 {
            warn!(pruned, "departed entities removed");
        }

        let stats = RosterStats {
            active: roster.active.len(),
            non_roster: roster.non_roster.len(),
            pruned,
        };
        info!(
            active = stats.active,
            non_roster = stats.non_roster,
            pruned = stats.pruned,
            "roster sync complete"
        );

        Ok(stats)
    }
}

/// Which roster section a heading opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Active,
    NonRoster,
    DeadCap,
    Unknown,
}

fn classify_heading(text: &str) -> Section {
    let lower = text.to_lowercase();
    if lower.contains("dead cap") {
        Section::DeadCap
    } else if lower.contains("non-roster") || lower.contains("non roster") {
        Section::NonRoster
    } else if lower.contains("roster") {
        Section::Active
    } else {
        Section::Unknown
    }
}

/// Parse player names out of the roster document. Sections are delimited by
/// headings; the dead-cap section is skipped (those players are gone and
/// must not keep matching news text). Names are taken from anchor text that
/// looks like a person's name.
pub fn parse_roster(html: &str) -> ParsedRoster {
    let mut roster = ParsedRoster::default();

    // Heading spans: (start of content, section kind).
    let mut sections: Vec<(usize, Section)> = Vec::new();
    for cap in HEADING_RE.captures_iter(html) {
        let heading = TAG_RE.replace_all(&cap[1], " ");
        let section = classify_heading(heading.trim());
        if let Some(m) = cap.get(0) {
            sections.push((m.end(), section));
        }
    }

    let mut seen: HashSet<String> = HashSet::new();

    for (i, (start, section)) in sections.iter().enumerate() {
        let end = sections
            .get(i + 1)
            .map(|(next_start, _)| *next_start)
            .unwrap_or(html.len());
        let body = &html[*start..end.max(*start)];

        let bucket = match section {
            Section::Active => &mut roster.active,
            Section::NonRoster => &mut roster.non_roster,
            Section::DeadCap | Section::Unknown => continue,
        };

        for cap in ANCHOR_TEXT_RE.captures_iter(body) {
            let text = cap[1].split_whitespace().collect::<Vec<_>>().join(" ");
            if looks_like_person_name(&text) && seen.insert(slugify(&text)) {
                bucket.push(text);
            }
        }
    }

    roster
}

/// Two to four capitalized words made of letters plus name punctuation.
fn looks_like_person_name(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 || words.len() > 4 {
        return false;
    }
    words.iter().all(|w| {
        w.chars().next().is_some_and(|c| c.is_uppercase())
            && w.chars()
                .all(|c| c.is_alphabetic() || matches!(c, '\'' | '-' | '.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER_PAGE: &str = r#"
        <h2>Team Roster 2025-26</h2>
        <table>
            <tr><td><a href="/p/1">Jane Doe</a></td><td>C</td></tr>
            <tr><td><a href="/p/2">Sam O'Neill</a></td><td>D</td></tr>
            <tr><td><a href="/stats">Full stats</a></td></tr>
        </table>
        <h2>Non-Roster</h2>
        <ul>
            <li><a href="/p/3">Alex Roy-Martin</a></li>
        </ul>
        <h2>Dead Cap</h2>
        <ul>
            <li><a href="/p/4">Gone Player</a></li>
        </ul>
    "#;

    #[test]
    fn parses_active_and_non_roster_sections() {
        let roster = parse_roster(ROSTER_PAGE);
        assert_eq!(roster.active, vec!["Jane Doe", "Sam O'Neill"]);
        assert_eq!(roster.non_roster, vec!["Alex Roy-Martin"]);
    }

    #[test]
    fn dead_cap_section_is_skipped() {
        let roster = parse_roster(ROSTER_PAGE);
        assert!(!roster.active.contains(&"Gone Player".to_string()));
        assert!(!roster.non_roster.contains(&"Gone Player".to_string()));
    }

    #[test]
    fn non_name_anchors_are_filtered() {
        let roster = parse_roster(ROSTER_PAGE);
        assert!(!roster.active.iter().any(|n| n.contains("stats")));
    }

    #[test]
    fn empty_page_parses_to_empty_roster() {
        assert_eq!(parse_roster(""), ParsedRoster::default());
    }

    #[test]
    fn heading_classification() {
        assert_eq!(classify_heading("Team Roster"), Section::Active);
        assert_eq!(classify_heading("Non-Roster Invites"), Section::NonRoster);
        assert_eq!(classify_heading("Dead Cap"), Section::DeadCap);
        assert_eq!(classify_heading("Sponsors"), Section::Unknown);
    }
}
