//! Postgres-backed store tests. Each test provisions its own database via
//! the testutil harness and skips when TEST_DATABASE_URL is unset.

use chrono::{Duration, Utc};

use rinkwire_common::urls::ingest_hash;
use rinkwire_common::{EventType, IngestMethod, SourceCategory, SourceStatus, ValidationMethod, ValidationResult};
use rinkwire_store::testutil::test_store;
use rinkwire_store::{
    NewCandidateSource, NewCluster, NewRawItem, NewSource, NewStoryVariant, NewValidationLog,
    SourceRow, Store, StoryVariantRow,
};

async fn seed_source(store: &Store, name: &str, category: SourceCategory) -> SourceRow {
    store
        .insert_source(NewSource {
            name: name.to_string(),
            category,
            ingest_method: IngestMethod::Rss,
            base_url: format!("https://{name}.example.com"),
            feed_url: Some(format!("https://{name}.example.com/feed")),
            status: SourceStatus::Approved,
            priority: 100,
            metadata: serde_json::json!({}),
        })
        .await
        .expect("insert source")
}

fn raw_item(source_id: i64, url: &str, title: &str) -> NewRawItem {
    NewRawItem {
        source_id,
        source_item_id: None,
        ingestion_origin: "scheduled".to_string(),
        original_url: url.to_string(),
        canonical_url: url.to_string(),
        ingest_hash: ingest_hash(source_id, url, Some(title)),
        raw_title: Some(title.to_string()),
        raw_description: None,
        raw_content: None,
        published_at: Some(Utc::now()),
    }
}

async fn seed_variant(store: &Store, source_id: i64, url: &str, title: &str) -> StoryVariantRow {
    let raw = store
        .create_raw_item(raw_item(source_id, url, title))
        .await
        .expect("create raw item")
        .expect("raw item is new");

    store
        .create_story_variant(NewStoryVariant {
            raw_item_id: raw.id,
            source_id,
            url: url.to_string(),
            title: title.to_string(),
            content_type: rinkwire_common::ContentType::Article,
            published_at: raw.published_at.unwrap_or_else(Utc::now),
            tokens: vec!["jane".into(), "doe".into()],
            entities: vec![],
            event_type: EventType::Signing,
            source_signal: 2,
        })
        .await
        .expect("create variant")
        .expect("variant is new")
}

#[tokio::test]
async fn raw_item_dedup_probes() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    let source = seed_source(store, "probe", SourceCategory::Press).await;

    let mut first = raw_item(source.id, "https://ex.com/a", "Title");
    first.source_item_id = Some("guid-1".to_string());
    assert!(store.create_raw_item(first).await.unwrap().is_some());

    // Same (source, source_item_id), everything else different.
    let mut by_guid = raw_item(source.id, "https://ex.com/other", "Other");
    by_guid.source_item_id = Some("guid-1".to_string());
    assert!(store.create_raw_item(by_guid).await.unwrap().is_none());

    // Same canonical URL.
    let by_url = raw_item(source.id, "https://ex.com/a", "Retitled");
    assert!(store.create_raw_item(by_url).await.unwrap().is_none());

    // Same ingest hash (same source + canonical + title).
    let mut by_hash = raw_item(source.id, "https://ex.com/b", "Title");
    by_hash.canonical_url = "https://ex.com/b2".to_string();
    by_hash.ingest_hash = ingest_hash(source.id, "https://ex.com/a", Some("Title"));
    assert!(store.create_raw_item(by_hash).await.unwrap().is_none());
}

#[tokio::test]
async fn variant_url_is_globally_unique() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    let s1 = seed_source(store, "one", SourceCategory::Press).await;
    let s2 = seed_source(store, "two", SourceCategory::Other).await;

    seed_variant(store, s1.id, "https://ex.com/story", "Story").await;

    let raw = store
        .create_raw_item(raw_item(s2.id, "https://ex.com/story-b", "Story B"))
        .await
        .unwrap()
        .unwrap();
    let duplicate = store
        .create_story_variant(NewStoryVariant {
            raw_item_id: raw.id,
            source_id: s2.id,
            url: "https://ex.com/story".to_string(),
            title: "Story B".to_string(),
            content_type: rinkwire_common::ContentType::Article,
            published_at: Utc::now(),
            tokens: vec![],
            entities: vec![],
            event_type: EventType::Other,
            source_signal: 1,
        })
        .await
        .unwrap();

    assert!(duplicate.is_none(), "same URL resolves to the duplicate path");
}

#[tokio::test]
async fn fetch_bookkeeping_success_resets_error_counter() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    let source = seed_source(store, "book", SourceCategory::Press).await;

    assert_eq!(store.mark_fetch_failure(source.id).await.unwrap(), 1);
    assert_eq!(store.mark_fetch_failure(source.id).await.unwrap(), 2);

    store.mark_fetch_success(source.id).await.unwrap();
    let row = store.source_by_id(source.id).await.unwrap().unwrap();
    assert_eq!(row.fetch_error_count, 0);
    assert!(row.last_fetched_at.is_some());
}

#[tokio::test]
async fn user_submission_source_is_seeded() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let reserved = store.user_submission_source().await.unwrap();
    assert_eq!(reserved.status, "approved");
    // Kept out of the fetch fan-out, but subject to the normal relevance
    // gate like every other source.
    assert!(reserved.metadata_flag("skip_fetch"));
    assert!(!reserved.metadata_flag("skip_relevance_check"));

    seed_source(store, "real", SourceCategory::Press).await;
    let approved = store.approved_sources().await.unwrap();
    assert!(approved.iter().any(|s| s.id == reserved.id));
    assert!(approved.iter().any(|s| s.name == "real"));
}

#[tokio::test]
async fn submission_rate_limit_refuses_over_cap() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    for i in 0..3 {
        let created = store
            .create_submission(&format!("https://ex.com/{i}"), Some("10.0.0.1"), None, 3)
            .await
            .unwrap();
        assert!(created.is_some(), "submission {i} under the cap");
    }

    let over_cap = store
        .create_submission("https://ex.com/last", Some("10.0.0.1"), None, 3)
        .await
        .unwrap();
    assert!(over_cap.is_none(), "4th submission in the hour is refused");

    // A different IP is unaffected.
    let other_ip = store
        .create_submission("https://ex.com/other", Some("10.0.0.2"), None, 3)
        .await
        .unwrap();
    assert!(other_ip.is_some());
}

#[tokio::test]
async fn merge_clusters_repoints_and_unions() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    let source = seed_source(store, "merge", SourceCategory::Press).await;

    let shared = store
        .upsert_entity("Jane Doe", "player", serde_json::json!({}))
        .await
        .unwrap();

    let now = Utc::now();
    let target = store
        .create_cluster(NewCluster {
            headline: "Target".to_string(),
            headline_source_signal: 2,
            event_type: EventType::Signing,
            first_seen_at: now - Duration::hours(2),
            last_seen_at: now - Duration::hours(2),
            tokens: vec!["jane".into(), "doe".into()],
            entities_agg: vec![shared.id],
        })
        .await
        .unwrap();
    let other = store
        .create_cluster(NewCluster {
            headline: "Other".to_string(),
            headline_source_signal: 2,
            event_type: EventType::Signing,
            first_seen_at: now - Duration::hours(1),
            last_seen_at: now,
            tokens: vec!["doe".into(), "extension".into()],
            entities_agg: vec![shared.id],
        })
        .await
        .unwrap();

    let v1 = seed_variant(store, source.id, "https://ex.com/1", "One").await;
    let v2 = seed_variant(store, source.id, "https://ex.com/2", "Two").await;
    let v3 = seed_variant(store, source.id, "https://ex.com/3", "Three").await;

    store.link_variant_to_cluster(target.id, v1.id, Some(1.0)).await.unwrap();
    store.link_variant_to_cluster(other.id, v2.id, Some(1.0)).await.unwrap();
    store.link_variant_to_cluster(other.id, v3.id, Some(0.7)).await.unwrap();
    store.refresh_cluster_source_count(target.id).await.unwrap();
    store.refresh_cluster_source_count(other.id).await.unwrap();

    store.add_cluster_entity(target.id, shared.id).await.unwrap();
    store.add_cluster_entity(other.id, shared.id).await.unwrap();

    let merged = store.merge_clusters(target.id, &[other.id]).await.unwrap();

    assert_eq!(merged.id, target.id);
    assert_eq!(merged.source_count, 3);
    assert!(store.cluster_by_id(other.id).await.unwrap().is_none());

    let links = store.cluster_variant_links(target.id).await.unwrap();
    let mut variant_ids: Vec<i64> = links.iter().map(|l| l.variant_id).collect();
    variant_ids.sort();
    assert_eq!(variant_ids, vec![v1.id, v2.id, v3.id]);

    assert!(merged.tokens.contains(&"extension".to_string()));
    assert_eq!(merged.entities_agg, vec![shared.id]);
    assert_eq!(merged.first_seen_at, target.first_seen_at);
    assert_eq!(merged.last_seen_at, other.last_seen_at);

    // The shared entity produced exactly one association row.
    let entities = store.cluster_entity_rows(target.id).await.unwrap();
    assert_eq!(entities.len(), 1);
}

#[tokio::test]
async fn purge_cascades_and_nulls_submission_references() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    let source = seed_source(store, "purge", SourceCategory::Press).await;

    let variant = seed_variant(store, source.id, "https://ex.com/old", "Old story").await;
    let cluster = store
        .create_cluster(NewCluster {
            headline: "Old story".to_string(),
            headline_source_signal: 2,
            event_type: EventType::Other,
            first_seen_at: Utc::now(),
            last_seen_at: Utc::now(),
            tokens: vec![],
            entities_agg: vec![],
        })
        .await
        .unwrap();
    store.link_variant_to_cluster(cluster.id, variant.id, Some(1.0)).await.unwrap();

    let submission = store
        .create_submission("https://ex.com/old", Some("10.1.1.1"), None, 10)
        .await
        .unwrap()
        .unwrap();
    store
        .mark_submission_published(submission.id, variant.raw_item_id)
        .await
        .unwrap();

    // Backdate beyond the retention window.
    let stale = Utc::now() - Duration::days(45);
    sqlx::query("UPDATE raw_items SET created_at = $1")
        .bind(stale)
        .execute(store.pool())
        .await
        .unwrap();
    sqlx::query("UPDATE clusters SET last_seen_at = $1")
        .bind(stale)
        .execute(store.pool())
        .await
        .unwrap();

    let (clusters, raw_items) = store.purge_older_than_days(30).await.unwrap();
    assert_eq!(clusters, 1);
    assert_eq!(raw_items, 1);

    assert!(store.raw_item_by_id(variant.raw_item_id).await.unwrap().is_none());
    assert!(store.variant_by_url("https://ex.com/old").await.unwrap().is_none());
    assert!(store.cluster_by_id(cluster.id).await.unwrap().is_none());

    let after = store.submission_by_id(submission.id).await.unwrap().unwrap();
    assert_eq!(after.raw_item_id, None, "submission reference nulled on delete");
}

#[tokio::test]
async fn feed_cache_roundtrip_and_expiry() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let payload = serde_json::json!({"clusters": [1, 2, 3]});
    store.cache_put("feed:page1", &payload, Duration::minutes(5)).await.unwrap();
    assert_eq!(store.cache_get("feed:page1").await.unwrap(), Some(payload));

    // Already-expired entries are invisible and then swept.
    store
        .cache_put("feed:old", &serde_json::json!({}), Duration::minutes(-5))
        .await
        .unwrap();
    assert_eq!(store.cache_get("feed:old").await.unwrap(), None);
    let removed = store.cleanup_expired_cache().await.unwrap();
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn entity_upsert_is_keyed_by_slug() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let first = store
        .upsert_entity("Jane Doe", "player", serde_json::json!({"number": 9}))
        .await
        .unwrap();
    let second = store
        .upsert_entity("Jane Doe", "player", serde_json::json!({"number": 19}))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.slug, "jane-doe");
    assert_eq!(second.metadata["number"], 19);
}

#[tokio::test]
async fn departed_entities_are_pruned_but_teams_stay() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let kept = store.upsert_entity("Jane Doe", "player", serde_json::json!({})).await.unwrap();
    store.upsert_entity("Gone Player", "player", serde_json::json!({})).await.unwrap();
    let team = store
        .upsert_entity("San Jose Sharks", "team", serde_json::json!({}))
        .await
        .unwrap();

    let pruned = store
        .prune_departed_entities(&["jane-doe".to_string()])
        .await
        .unwrap();
    assert_eq!(pruned, 1);

    let remaining = store.all_entities().await.unwrap();
    let ids: Vec<i64> = remaining.iter().map(|e| e.id).collect();
    assert!(ids.contains(&kept.id));
    assert!(ids.contains(&team.id), "team entities survive roster pruning");
    assert_eq!(remaining.len(), 2);
}

#[tokio::test]
async fn tags_are_created_lazily_once() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let first = store.get_or_create_tag("Signing").await.unwrap();
    let second = store.get_or_create_tag("Signing").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.slug, "signing");
}

#[tokio::test]
async fn candidate_source_approval_creates_source() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let submission = store
        .create_submission("https://newsite.com/story", Some("10.2.2.2"), None, 10)
        .await
        .unwrap()
        .unwrap();

    let candidate = store
        .create_candidate_source(NewCandidateSource {
            domain: "newsite.com".to_string(),
            base_url: "https://newsite.com".to_string(),
            discovered_from_submission_id: Some(submission.id),
            suggested_category: Some(SourceCategory::Other),
            suggested_ingest_method: Some(IngestMethod::Rss),
            discovered_feed_url: Some("https://newsite.com/feed".to_string()),
            rss_discovery_attempted: true,
        })
        .await
        .unwrap();
    assert!(candidate.rss_discovery_success);
    assert_eq!(candidate.status, "queued_for_review");

    // Repeat submissions only bump the counter.
    let bumped = store.record_candidate_submission("newsite.com").await.unwrap().unwrap();
    assert_eq!(bumped.times_submitted, 2);

    let source = store
        .approve_candidate_source(candidate.id, "New Site", SourceCategory::Press, IngestMethod::Rss, Some("admin"))
        .await
        .unwrap();
    assert_eq!(source.status, "approved");
    assert_eq!(source.feed_url.as_deref(), Some("https://newsite.com/feed"));

    let reviewed = store.candidate_source_by_domain("newsite.com").await.unwrap().unwrap();
    assert_eq!(reviewed.status, "approved");
    assert!(reviewed.reviewed_at.is_some());
}

#[tokio::test]
async fn feed_lists_active_clusters_most_recent_first() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let older = store
        .create_cluster(NewCluster {
            headline: "Older".to_string(),
            headline_source_signal: 1,
            event_type: EventType::Game,
            first_seen_at: Utc::now() - Duration::hours(6),
            last_seen_at: Utc::now() - Duration::hours(6),
            tokens: vec![],
            entities_agg: vec![],
        })
        .await
        .unwrap();
    let newer = store
        .create_cluster(NewCluster {
            headline: "Newer".to_string(),
            headline_source_signal: 1,
            event_type: EventType::Game,
            first_seen_at: Utc::now() - Duration::hours(1),
            last_seen_at: Utc::now() - Duration::hours(1),
            tokens: vec![],
            entities_agg: vec![],
        })
        .await
        .unwrap();

    let feed = store.feed_clusters(10, 0).await.unwrap();
    let ids: Vec<i64> = feed.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    store.increment_click_count(newer.id).await.unwrap();
    let clicked = store.cluster_by_id(newer.id).await.unwrap().unwrap();
    assert_eq!(clicked.click_count, 1);

    store.increment_metric("page_views", 2).await.unwrap();
    store.increment_metric("page_views", 3).await.unwrap();
    assert_eq!(store.metric_value("page_views").await.unwrap(), 5);
    assert_eq!(store.metric_value("missing").await.unwrap(), 0);
}

#[tokio::test]
async fn validation_logs_record_decisions() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    let source = seed_source(store, "logs", SourceCategory::Press).await;

    let raw = store
        .create_raw_item(raw_item(source.id, "https://ex.com/logged", "Logged"))
        .await
        .unwrap()
        .unwrap();

    store
        .insert_validation_log(NewValidationLog {
            raw_item_id: raw.id,
            method: ValidationMethod::Keyword,
            result: ValidationResult::Rejected,
            llm_response: None,
            llm_model: None,
            keyword_matched: Some(false),
            entities_found: vec![],
            reason: None,
            latency_ms: Some(0),
            error_message: None,
        })
        .await
        .unwrap();

    let logs = store.validation_logs_for_item(raw.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].method, "keyword");
    assert_eq!(logs[0].result, "rejected");
    assert_eq!(logs[0].keyword_matched, Some(false));
}

#[tokio::test]
async fn feed_ordering_prefers_official_then_recent() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;

    let press = seed_source(store, "press", SourceCategory::Press).await;
    let official = seed_source(store, "official", SourceCategory::Official).await;

    let cluster = store
        .create_cluster(NewCluster {
            headline: "Story".to_string(),
            headline_source_signal: 2,
            event_type: EventType::Signing,
            first_seen_at: Utc::now(),
            last_seen_at: Utc::now(),
            tokens: vec![],
            entities_agg: vec![],
        })
        .await
        .unwrap();

    // Press variant is newer, official older; official must still sort first.
    let press_raw = store
        .create_raw_item(raw_item(press.id, "https://ex.com/p", "Press story"))
        .await
        .unwrap()
        .unwrap();
    let press_variant = store
        .create_story_variant(NewStoryVariant {
            raw_item_id: press_raw.id,
            source_id: press.id,
            url: "https://ex.com/p".to_string(),
            title: "Press story".to_string(),
            content_type: rinkwire_common::ContentType::Article,
            published_at: Utc::now(),
            tokens: vec![],
            entities: vec![],
            event_type: EventType::Signing,
            source_signal: 2,
        })
        .await
        .unwrap()
        .unwrap();

    let official_raw = store
        .create_raw_item(raw_item(official.id, "https://ex.com/o", "Official story"))
        .await
        .unwrap()
        .unwrap();
    let official_variant = store
        .create_story_variant(NewStoryVariant {
            raw_item_id: official_raw.id,
            source_id: official.id,
            url: "https://ex.com/o".to_string(),
            title: "Official story".to_string(),
            content_type: rinkwire_common::ContentType::Article,
            published_at: Utc::now() - Duration::hours(3),
            tokens: vec![],
            entities: vec![],
            event_type: EventType::Signing,
            source_signal: 3,
        })
        .await
        .unwrap()
        .unwrap();

    store.link_variant_to_cluster(cluster.id, press_variant.id, Some(0.8)).await.unwrap();
    store.link_variant_to_cluster(cluster.id, official_variant.id, Some(0.9)).await.unwrap();

    let ordered = store.cluster_variants_ordered(cluster.id).await.unwrap();
    assert_eq!(ordered.len(), 2);
    assert_eq!(ordered[0].id, official_variant.id);
    assert_eq!(ordered[1].id, press_variant.id);
}
