//! Task execution: fetch dispatch with retry, the enrichment pipeline,
//! submission processing, and maintenance.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use ollama_client::TextGenerator;
use tracing::{info, warn};

use rinkwire_common::{ContentType, IngestMethod};
use rinkwire_enrich::{
    assign_tags, check_relevance, classify_event_type, extract_entities, non_team_entity_ids,
    normalize_tokens, RelevanceRequest,
};
use rinkwire_ingest::SubmissionOutcome;
use rinkwire_store::NewStoryVariant;

use crate::app::App;
use crate::queue::Task;

/// Data retention window for raw items and clusters.
const PURGE_AFTER_DAYS: i64 = 30;

/// Base delay for fetch retry backoff (doubles per attempt).
const RETRY_BASE_SECONDS: u64 = 60;

/// How the enrichment pipeline ended for one raw item. Skips and
/// duplicates are successes, not retryable failures.
#[derive(Debug, PartialEq, Eq)]
pub enum EnrichOutcome {
    Skipped(&'static str),
    Duplicate,
    Completed { variant_id: i64, cluster_id: i64 },
}

pub async fn execute(app: &App, task: Task) -> Result<()> {
    match task {
        Task::FetchSource { source_id, attempt } => run_fetch(app, source_id, attempt).await,
        Task::Enrich { raw_item_id } => run_enrich(app, raw_item_id).await.map(|_| ()),
        Task::ProcessSubmission { submission_id } => run_submission(app, submission_id).await,
        Task::SyncRoster => run_roster_sync(app).await,
        Task::PurgeOldData => {
            app.store.purge_older_than_days(PURGE_AFTER_DAYS).await?;
            Ok(())
        }
        Task::CleanupFeedCache => {
            let removed = app.store.cleanup_expired_cache().await?;
            if removed > 0 {
                info!(removed, "expired feed cache entries removed");
            }
            Ok(())
        }
    }
}

/// Fetch one source; enqueue enrichment for every new raw item. Failures
/// retry with exponential backoff (60·2^attempt seconds) up to the
/// configured cap, then surface as a task failure.
async fn run_fetch(app: &App, source_id: i64, attempt: u32) -> Result<()> {
    let Some(source) = app.store.source_by_id(source_id).await? else {
        warn!(source_id, "fetch skipped: source no longer exists");
        return Ok(());
    };

    match app.fetcher.fetch_source(&source).await {
        Ok(report) => {
            for raw_item_id in report.new_item_ids {
                app.queue.enqueue(Task::Enrich { raw_item_id });
            }
            Ok(())
        }
        Err(e) if attempt < app.config.max_fetch_retries => {
            let delay = Duration::from_secs(RETRY_BASE_SECONDS * 2u64.pow(attempt));
            warn!(
                source_id,
                attempt,
                delay_secs = delay.as_secs(),
                error = %e,
                "fetch failed, retry scheduled"
            );
            let queue = app.queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                queue.enqueue(Task::FetchSource {
                    source_id,
                    attempt: attempt + 1,
                });
            });
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// The enrichment pipeline: relevance → tokens → entities → classify →
/// variant → cluster. Irrelevant items and duplicates short-circuit to a
/// recorded skip; only infrastructure errors propagate.
pub async fn run_enrich(app: &App, raw_item_id: i64) -> Result<EnrichOutcome> {
    let Some(raw_item) = app.store.raw_item_by_id(raw_item_id).await? else {
        warn!(raw_item_id, "enrich skipped: raw item not found");
        return Ok(EnrichOutcome::Skipped("raw item not found"));
    };
    let Some(source) = app.store.source_by_id(raw_item.source_id).await? else {
        warn!(raw_item_id, "enrich skipped: source not found");
        return Ok(EnrichOutcome::Skipped("source not found"));
    };

    let text = format!(
        "{} {}",
        raw_item.raw_title.as_deref().unwrap_or(""),
        raw_item.raw_description.as_deref().unwrap_or("")
    );

    let roster = app.store.all_entities().await?;
    let entity_ids = extract_entities(&roster, &text, &app.config.topic_keywords);
    let non_team = non_team_entity_ids(&roster, &entity_ids);

    // Relevance gate. The LLM handle is reset after any errored call so the
    // next item gets a fresh client.
    let llm = app.llm.get().await;
    let decision = check_relevance(
        RelevanceRequest {
            raw_item_id: raw_item.id,
            title: raw_item.raw_title.as_deref().unwrap_or(""),
            description: raw_item.raw_description.as_deref(),
            entity_ids: &entity_ids,
            non_team_entity_ids: &non_team,
            skip_relevance_check: source.metadata_flag("skip_relevance_check"),
            topic_keywords: &app.config.topic_keywords,
            llm_enabled: app.config.llm_relevance_enabled,
            evaluation_mode: app.config.llm_evaluation_mode,
        },
        llm.as_deref().map(|client| client as &dyn TextGenerator),
    )
    .await;

    let llm_errored = decision.log.error_message.is_some();
    let approved = decision.approved;
    app.store.insert_validation_log(decision.log).await?;
    if llm_errored {
        app.llm.reset().await;
    }

    if !approved {
        info!(raw_item_id, title = %raw_item.display_title(), "item not relevant, skipped");
        return Ok(EnrichOutcome::Skipped("not relevant"));
    }

    let tokens = normalize_tokens(&text);
    let event_type = classify_event_type(&text);

    let content_type = match source.ingest_method() {
        Some(IngestMethod::Reddit) => ContentType::ForumPost,
        Some(IngestMethod::Twitter) => ContentType::SocialPost,
        _ => ContentType::Article,
    };

    let url = raw_item
        .canonical_url
        .clone()
        .unwrap_or_else(|| raw_item.original_url.clone());
    let title = raw_item.display_title().to_string();

    let created = app
        .store
        .create_story_variant(NewStoryVariant {
            raw_item_id: raw_item.id,
            source_id: source.id,
            url,
            title,
            content_type,
            published_at: raw_item.published_at.unwrap_or_else(Utc::now),
            tokens,
            entities: entity_ids,
            event_type,
            source_signal: source.source_signal(),
        })
        .await?;

    let Some(variant) = created else {
        info!(raw_item_id, "variant already exists for URL, skipped");
        return Ok(EnrichOutcome::Duplicate);
    };

    let tag_names = assign_tags(&variant.title, &variant.url, source.category());
    let team_entity_ids: HashSet<i64> = roster
        .iter()
        .filter(|e| e.is_team())
        .map(|e| e.id)
        .collect();

    let assignment = app
        .clusterer
        .assign(&variant, &tag_names, &team_entity_ids)
        .await?;

    if assignment.created {
        app.store.increment_metric("clusters_created", 1).await?;
    }

    Ok(EnrichOutcome::Completed {
        variant_id: variant.id,
        cluster_id: assignment.cluster_id,
    })
}

/// Process a submission; a published outcome feeds back into enrichment.
async fn run_submission(app: &App, submission_id: i64) -> Result<()> {
    let outcome = app.submissions.process(submission_id).await?;

    if let SubmissionOutcome::Published { raw_item_id } = outcome {
        app.queue.enqueue(Task::Enrich { raw_item_id });
    }

    Ok(())
}

async fn run_roster_sync(app: &App) -> Result<()> {
    let Some(roster_url) = app.config.roster_url.as_deref() else {
        info!("roster sync skipped: ROSTER_URL not configured");
        return Ok(());
    };

    app.roster.sync(roster_url).await?;
    Ok(())
}
