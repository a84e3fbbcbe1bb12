//! Relevance filter: decides whether an item is on-topic before it becomes
//! a story variant.
//!
//! Two strategies. The keyword strategy looks for topic keywords in the
//! title (descriptions are polluted by aggregator chrome) or at least one
//! non-team entity match. The LLM strategy asks a yes/no question with a
//! tiny token budget. LLM failures of any kind fail open: an unavailable
//! filter must never stall ingestion.

use std::time::Instant;

use ollama_client::TextGenerator;
use rinkwire_common::{ValidationMethod, ValidationResult};
use rinkwire_store::NewValidationLog;
use tracing::warn;

const RELEVANCE_PROMPT: &str = "You are a relevance filter for a San Jose Sharks news aggregator. \
Given an article title and description, respond with YES if the article is primarily about the \
San Jose Sharks, their players, staff, or organization. Respond NO if the Sharks are only \
mentioned in passing (e.g., as an upcoming opponent, in a league standings table, or in a \
general NHL roundup). Respond with only YES or NO.\n\n\
Title: {title}\nDescription: {description}\n\nResponse:";

/// How the raw LLM text is kept in the audit log.
const MAX_STORED_RESPONSE: usize = 50;

/// Inputs to one relevance decision.
pub struct RelevanceRequest<'a> {
    pub raw_item_id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    /// All entity ids matched in the text (stored in the log).
    pub entity_ids: &'a [i64],
    /// Non-team subset; team mentions alone do not establish relevance.
    pub non_team_entity_ids: &'a [i64],
    /// Source metadata flag: dedicated sources skip the check entirely.
    pub skip_relevance_check: bool,
    pub topic_keywords: &'a [String],
    pub llm_enabled: bool,
    /// Shadow mode: keyword decides, LLM response recorded for comparison.
    pub evaluation_mode: bool,
}

/// The decision plus the audit row to persist. Exactly one log row per call.
pub struct RelevanceDecision {
    pub approved: bool,
    pub log: NewValidationLog,
}

/// Decide relevance. Never returns an error: every failure mode degrades to
/// an approved decision with the error recorded.
pub async fn check_relevance(
    request: RelevanceRequest<'_>,
    llm: Option<&dyn TextGenerator>,
) -> RelevanceDecision {
    if request.skip_relevance_check {
        return RelevanceDecision {
            approved: true,
            log: base_log(
                &request,
                ValidationMethod::Skip,
                ValidationResult::Approved,
                Some("source skips relevance check".to_string()),
            ),
        };
    }

    let keyword_matched = keyword_relevant(&request);

    if request.evaluation_mode {
        // Keyword decides; the LLM runs in shadow for disagreement analysis.
        let mut log = base_log(
            &request,
            ValidationMethod::Keyword,
            if keyword_matched {
                ValidationResult::Approved
            } else {
                ValidationResult::Rejected
            },
            Some("keyword decision (llm shadow-logged)".to_string()),
        );
        log.keyword_matched = Some(keyword_matched);

        if let Some(llm) = llm {
            let shadow = run_llm(&request, llm).await;
            log.llm_response = shadow.response;
            log.llm_model = Some(llm.model().to_string());
            log.latency_ms = Some(shadow.latency_ms);
            log.error_message = shadow.error;
        }

        return RelevanceDecision {
            approved: keyword_matched,
            log,
        };
    }

    if request.llm_enabled {
        if let Some(llm) = llm {
            let outcome = run_llm(&request, llm).await;
            let mut log = base_log(
                &request,
                ValidationMethod::Llm,
                match (&outcome.error, outcome.is_relevant) {
                    (Some(_), _) => ValidationResult::Error,
                    (None, true) => ValidationResult::Approved,
                    (None, false) => ValidationResult::Rejected,
                },
                None,
            );
            log.llm_response = outcome.response;
            log.llm_model = Some(llm.model().to_string());
            log.keyword_matched = Some(keyword_matched);
            log.latency_ms = Some(outcome.latency_ms);
            log.error_message = outcome.error;

            // Fail open: errors and ambiguous output approve the item.
            return RelevanceDecision {
                approved: outcome.is_relevant,
                log,
            };
        }
    }

    let mut log = base_log(
        &request,
        ValidationMethod::Keyword,
        if keyword_matched {
            ValidationResult::Approved
        } else {
            ValidationResult::Rejected
        },
        None,
    );
    log.keyword_matched = Some(keyword_matched);

    RelevanceDecision {
        approved: keyword_matched,
        log,
    }
}

/// Keyword strategy: a topic keyword in the title, or at least one non-team
/// entity. Team entities alone appear in site chrome and don't count.
fn keyword_relevant(request: &RelevanceRequest<'_>) -> bool {
    let title_lower = request.title.to_lowercase();
    if request
        .topic_keywords
        .iter()
        .any(|kw| title_lower.contains(kw.as_str()))
    {
        return true;
    }
    !request.non_team_entity_ids.is_empty()
}

struct LlmOutcome {
    is_relevant: bool,
    response: Option<String>,
    error: Option<String>,
    latency_ms: i32,
}

async fn run_llm(request: &RelevanceRequest<'_>, llm: &dyn TextGenerator) -> LlmOutcome {
    let prompt = RELEVANCE_PROMPT
        .replace("{title}", request.title)
        .replace("{description}", request.description.unwrap_or("(no description)"));

    let started = Instant::now();
    let result = llm.generate(&prompt).await;
    let latency_ms = started.elapsed().as_millis() as i32;

    match result {
        Ok(text) => {
            let upper = text.trim().to_uppercase();
            if upper.starts_with("YES") {
                LlmOutcome {
                    is_relevant: true,
                    response: Some(truncate(&upper, 10)),
                    error: None,
                    latency_ms,
                }
            } else if upper.starts_with("NO") {
                LlmOutcome {
                    is_relevant: false,
                    response: Some(truncate(&upper, 10)),
                    error: None,
                    latency_ms,
                }
            } else {
                // Ambiguous output: record the error, accept the article.
                warn!(response = %truncate(&upper, MAX_STORED_RESPONSE), "ambiguous LLM relevance response");
                LlmOutcome {
                    is_relevant: true,
                    response: Some(truncate(&upper, MAX_STORED_RESPONSE)),
                    error: Some(format!(
                        "Ambiguous LLM response: {}",
                        truncate(&upper, MAX_STORED_RESPONSE)
                    )),
                    latency_ms,
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "LLM relevance check failed, failing open");
            LlmOutcome {
                is_relevant: true,
                response: None,
                error: Some(truncate(&e.to_string(), 200)),
                latency_ms,
            }
        }
    }
}

fn base_log(
    request: &RelevanceRequest<'_>,
    method: ValidationMethod,
    result: ValidationResult,
    reason: Option<String>,
) -> NewValidationLog {
    NewValidationLog {
        raw_item_id: request.raw_item_id,
        method,
        result,
        llm_response: None,
        llm_model: None,
        keyword_matched: None,
        entities_found: request.entity_ids.to_vec(),
        reason,
        latency_ms: None,
        error_message: None,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
