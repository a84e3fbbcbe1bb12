//! End-to-end pipeline tests: fetch → raw item → enrich → variant →
//! cluster, against a throwaway database and a local HTTP responder.
//! Skipped when TEST_DATABASE_URL is unset.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use rinkwire_common::urls::ingest_hash;
use rinkwire_common::{Config, EventType, IngestMethod, SourceCategory, SourceStatus};
use rinkwire_store::testutil::test_store;
use rinkwire_store::{NewRawItem, NewSource, SourceRow, Store};
use rinkwire_worker::tasks::{run_enrich, EnrichOutcome};
use rinkwire_worker::{App, TaskQueue};

/// Serve a fixed body on a loopback port for the lifetime of the test.
async fn serve(body: String, content_type: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/feed.xml")
}

fn rss_feed(link: &str, title: &str, published: DateTime<Utc>) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>Test Feed</title><link>https://ex.com</link><description>d</description>
<item>
  <guid>item-1</guid>
  <title>{title}</title>
  <link>{link}</link>
  <pubDate>{}</pubDate>
</item>
</channel></rss>"#,
        published.to_rfc2822()
    )
}

/// LLM disabled: the keyword strategy decides, no network dependency.
fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        llm_relevance_enabled: false,
        llm_evaluation_mode: false,
        ..Config::default()
    }
}

async fn test_app(store: &Store) -> Arc<App> {
    let (queue, _rx) = TaskQueue::new();
    let config = test_config("unused://in-tests");
    Arc::new(App::new(config, store.clone(), queue).expect("build app"))
}

async fn seed_rss_source(
    store: &Store,
    name: &str,
    category: SourceCategory,
    feed_url: &str,
) -> SourceRow {
    store
        .insert_source(NewSource {
            name: name.to_string(),
            category,
            ingest_method: IngestMethod::Rss,
            base_url: format!("https://{name}.example.com"),
            feed_url: Some(feed_url.to_string()),
            status: SourceStatus::Approved,
            priority: 100,
            metadata: serde_json::json!({}),
        })
        .await
        .expect("insert source")
}

async fn seed_roster(store: &Store) {
    store
        .upsert_entity("Jane Doe", "player", serde_json::json!({}))
        .await
        .expect("seed player");
    store
        .upsert_entity("San Jose Sharks", "team", serde_json::json!({}))
        .await
        .expect("seed team");
}

#[tokio::test]
async fn rss_entry_becomes_a_new_cluster() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    seed_roster(store).await;

    let published = Utc::now() - Duration::hours(2);
    let feed = rss_feed(
        "https://ex.com/a?utm_source=x",
        "Team signs Jane Doe to two-year extension",
        published,
    );
    let feed_url = serve(feed, "application/rss+xml").await;
    let source = seed_rss_source(store, "press1", SourceCategory::Press, &feed_url).await;

    let app = test_app(store).await;
    let report = app.fetcher.fetch_source(&source).await.expect("fetch");
    assert_eq!(report.new_item_ids.len(), 1);
    assert_eq!(report.skipped, 0);

    let raw = store
        .raw_item_by_id(report.new_item_ids[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.canonical_url.as_deref(), Some("https://ex.com/a"));

    let outcome = run_enrich(&app, raw.id).await.expect("enrich");
    let EnrichOutcome::Completed {
        variant_id,
        cluster_id,
    } = outcome
    else {
        panic!("expected completed enrichment, got {outcome:?}");
    };

    let variant = store
        .variant_by_url("https://ex.com/a")
        .await
        .unwrap()
        .expect("variant exists");
    assert_eq!(variant.id, variant_id);
    assert_eq!(variant.event_type(), EventType::Signing);

    let jane = store
        .all_entities()
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.slug == "jane-doe")
        .unwrap();
    assert!(variant.entities.contains(&jane.id));

    let cluster = store.cluster_by_id(cluster_id).await.unwrap().unwrap();
    assert_eq!(cluster.headline, "Team signs Jane Doe to two-year extension");
    assert_eq!(cluster.event_type(), EventType::Signing);
    assert_eq!(cluster.source_count, 1);
    assert!(cluster.first_seen_at <= cluster.last_seen_at);

    let tags = store.cluster_tag_rows(cluster_id).await.unwrap();
    assert!(tags.iter().any(|t| t.name == "Signing"));

    // One audit row for the relevance decision.
    let logs = store.validation_logs_for_item(raw.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].result, "approved");
}

#[tokio::test]
async fn redelivered_entry_is_deduplicated() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    seed_roster(store).await;

    let published = Utc::now() - Duration::hours(2);
    let first = rss_feed(
        "https://ex.com/a?utm_source=x",
        "Team signs Jane Doe to two-year extension",
        published,
    );
    let first_url = serve(first, "application/rss+xml").await;
    let source = seed_rss_source(store, "press1", SourceCategory::Press, &first_url).await;

    let app = test_app(store).await;
    let report = app.fetcher.fetch_source(&source).await.expect("first fetch");
    assert_eq!(report.new_item_ids.len(), 1);
    let fetched_at_first = store
        .source_by_id(source.id)
        .await
        .unwrap()
        .unwrap()
        .last_fetched_at
        .expect("stamped");

    // Same entry, one extra tracking param: canonicalizes identically.
    let second = rss_feed(
        "https://ex.com/a?utm_source=x&utm_medium=y",
        "Team signs Jane Doe to two-year extension",
        published,
    );
    let second_url = serve(second, "application/rss+xml").await;
    sqlx::query("UPDATE sources SET feed_url = $2 WHERE id = $1")
        .bind(source.id)
        .bind(&second_url)
        .execute(store.pool())
        .await
        .unwrap();
    let source = store.source_by_id(source.id).await.unwrap().unwrap();

    let report = app.fetcher.fetch_source(&source).await.expect("second fetch");
    assert!(report.new_item_ids.is_empty(), "no new raw item");
    assert_eq!(report.skipped, 1);

    let after = store.source_by_id(source.id).await.unwrap().unwrap();
    assert_eq!(after.fetch_error_count, 0);
    assert!(after.last_fetched_at.expect("stamped") >= fetched_at_first);
}

#[tokio::test]
async fn second_story_attaches_to_existing_cluster() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    seed_roster(store).await;
    let app = test_app(store).await;

    let t0 = Utc::now() - Duration::hours(2);
    let feed1 = rss_feed(
        "https://ex.com/a",
        "Team signs Jane Doe to two-year extension",
        t0,
    );
    let url1 = serve(feed1, "application/rss+xml").await;
    let source1 = seed_rss_source(store, "press1", SourceCategory::Press, &url1).await;

    let report = app.fetcher.fetch_source(&source1).await.unwrap();
    let outcome = run_enrich(&app, report.new_item_ids[0]).await.unwrap();
    let EnrichOutcome::Completed { cluster_id, .. } = outcome else {
        panic!("first enrichment should complete");
    };

    let t1 = t0 + Duration::hours(1);
    let feed2 = rss_feed(
        "https://ex2.com/b",
        "Jane Doe's extension finalized by team",
        t1,
    );
    let url2 = serve(feed2, "application/rss+xml").await;
    let source2 = seed_rss_source(store, "press2", SourceCategory::Press, &url2).await;

    let report = app.fetcher.fetch_source(&source2).await.unwrap();
    let outcome = run_enrich(&app, report.new_item_ids[0]).await.unwrap();
    let EnrichOutcome::Completed {
        cluster_id: second_cluster,
        variant_id,
    } = outcome
    else {
        panic!("second enrichment should complete");
    };

    assert_eq!(second_cluster, cluster_id, "no new cluster opened");

    let cluster = store.cluster_by_id(cluster_id).await.unwrap().unwrap();
    assert_eq!(cluster.source_count, 2);
    assert!(cluster.tokens.contains(&"finalized".to_string()), "token union grew");

    // last_seen tracks the newer variant's publish time.
    let newest = store
        .variant_by_url("https://ex2.com/b")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(newest.id, variant_id);
    assert_eq!(cluster.last_seen_at, newest.published_at);

    let links = store.cluster_variant_links(cluster_id).await.unwrap();
    let attach = links
        .iter()
        .find(|l| l.variant_id == variant_id)
        .expect("link exists");
    let similarity = attach.similarity_score.expect("similarity recorded");
    assert!(similarity >= 0.62, "similarity {similarity} below match gate");
    assert!(similarity <= 1.0);
}

#[tokio::test]
async fn ambiguous_surname_without_topic_context_is_rejected() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    store
        .upsert_entity("Jeff Skinner", "player", serde_json::json!({}))
        .await
        .unwrap();
    let app = test_app(store).await;

    let source = seed_rss_source(store, "wire", SourceCategory::Press, "https://unused.example/feed").await;
    let title = "Stuart Skinner stops 40 shots for Oilers";
    let raw = store
        .create_raw_item(NewRawItem {
            source_id: source.id,
            source_item_id: None,
            ingestion_origin: "scheduled".to_string(),
            original_url: "https://ex.com/oilers".to_string(),
            canonical_url: "https://ex.com/oilers".to_string(),
            ingest_hash: ingest_hash(source.id, "https://ex.com/oilers", Some(title)),
            raw_title: Some(title.to_string()),
            raw_description: None,
            raw_content: None,
            published_at: Some(Utc::now()),
        })
        .await
        .unwrap()
        .unwrap();

    let outcome = run_enrich(&app, raw.id).await.unwrap();
    assert_eq!(outcome, EnrichOutcome::Skipped("not relevant"));

    // No variant, one rejected keyword log, no entity attached.
    assert!(store.variant_by_url("https://ex.com/oilers").await.unwrap().is_none());
    let logs = store.validation_logs_for_item(raw.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].method, "keyword");
    assert_eq!(logs[0].result, "rejected");
    assert_eq!(logs[0].entities_found, serde_json::json!([]));
}

#[tokio::test]
async fn submission_duplicate_and_rejection_paths() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    seed_roster(store).await;
    let app = test_app(store).await;

    // Build an existing variant via the pipeline.
    let t0 = Utc::now() - Duration::hours(1);
    let feed = rss_feed(
        "https://ex.com/a",
        "Team signs Jane Doe to two-year extension",
        t0,
    );
    let feed_url = serve(feed, "application/rss+xml").await;
    let source = seed_rss_source(store, "press1", SourceCategory::Press, &feed_url).await;
    let report = app.fetcher.fetch_source(&source).await.unwrap();
    run_enrich(&app, report.new_item_ids[0]).await.unwrap();

    // Submitting the same story (tracking params and all) is a duplicate.
    let submission = store
        .create_submission("https://ex.com/a?utm_source=social", Some("10.9.9.9"), None, 10)
        .await
        .unwrap()
        .unwrap();
    let outcome = app.submissions.process(submission.id).await.unwrap();
    assert_eq!(outcome, rinkwire_ingest::SubmissionOutcome::Duplicate);
    let row = store.submission_by_id(submission.id).await.unwrap().unwrap();
    assert_eq!(row.status, "duplicate");
    assert!(row.variant_id.is_some());

    // An unreachable URL is rejected with a reason.
    let submission = store
        .create_submission("https://127.0.0.1:9/untouchable", Some("10.9.9.9"), None, 10)
        .await
        .unwrap()
        .unwrap();
    let outcome = app.submissions.process(submission.id).await.unwrap();
    assert!(matches!(
        outcome,
        rinkwire_ingest::SubmissionOutcome::Rejected { .. }
    ));
    let row = store.submission_by_id(submission.id).await.unwrap().unwrap();
    assert_eq!(row.status, "rejected");
    assert!(row.rejection_reason.is_some());
}

#[tokio::test]
async fn submitted_item_goes_through_the_relevance_gate() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    seed_roster(store).await;
    let app = test_app(store).await;

    let page = "<html><head><title>Best pasta recipes of the year</title></head>\
                <body>food</body></html>";
    let page_url = serve(page.to_string(), "text/html").await;

    let submission = store
        .create_submission(&page_url, Some("10.8.8.8"), None, 10)
        .await
        .unwrap()
        .unwrap();
    let outcome = app.submissions.process(submission.id).await.unwrap();
    let rinkwire_ingest::SubmissionOutcome::Published { raw_item_id } = outcome else {
        panic!("expected published submission, got {outcome:?}");
    };

    // Off-topic title, no roster entities: the same keyword strategy that
    // gates fetched items rejects it before it reaches clustering.
    let outcome = run_enrich(&app, raw_item_id).await.unwrap();
    assert_eq!(outcome, EnrichOutcome::Skipped("not relevant"));

    let logs = store.validation_logs_for_item(raw_item_id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].method, "keyword");
    assert_eq!(logs[0].result, "rejected");
}

#[tokio::test]
async fn merge_tool_combines_parallel_clusters() {
    let Some(ctx) = test_store().await else { return };
    let store = &ctx.store;
    seed_roster(store).await;
    let app = test_app(store).await;

    // Two stories far enough apart in wording to open parallel clusters.
    let t0 = Utc::now() - Duration::hours(3);
    let feed1 = rss_feed(
        "https://ex.com/a",
        "Team signs Jane Doe to two-year extension",
        t0,
    );
    let url1 = serve(feed1, "application/rss+xml").await;
    let source1 = seed_rss_source(store, "press1", SourceCategory::Press, &url1).await;
    let report = app.fetcher.fetch_source(&source1).await.unwrap();
    let EnrichOutcome::Completed { cluster_id: c1, .. } =
        run_enrich(&app, report.new_item_ids[0]).await.unwrap()
    else {
        panic!("first enrichment should complete");
    };

    let feed2 = rss_feed(
        "https://ex2.com/b",
        "Sharks prospect report: development camp roundup notebook",
        t0 + Duration::hours(1),
    );
    let url2 = serve(feed2, "application/rss+xml").await;
    let source2 = seed_rss_source(store, "press2", SourceCategory::Press, &url2).await;
    let report = app.fetcher.fetch_source(&source2).await.unwrap();
    let EnrichOutcome::Completed { cluster_id: c2, .. } =
        run_enrich(&app, report.new_item_ids[0]).await.unwrap()
    else {
        panic!("second enrichment should complete");
    };

    assert_ne!(c1, c2, "stories should open distinct clusters");

    let before_first = store.cluster_by_id(c1).await.unwrap().unwrap();
    let before_second = store.cluster_by_id(c2).await.unwrap().unwrap();

    let merged = rinkwire_cluster::merge_clusters(store, &[c1, c2]).await.unwrap();
    assert_eq!(merged.id, c1);
    assert_eq!(merged.source_count, 2);
    assert!(store.cluster_by_id(c2).await.unwrap().is_none());
    assert_eq!(merged.first_seen_at, before_first.first_seen_at.min(before_second.first_seen_at));
    assert_eq!(merged.last_seen_at, before_first.last_seen_at.max(before_second.last_seen_at));

    for token in &before_second.tokens {
        assert!(merged.tokens.contains(token), "merged tokens missing {token}");
    }
}
