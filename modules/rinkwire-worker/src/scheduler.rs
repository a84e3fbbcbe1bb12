//! Periodic schedule: fetch fan-out, daily roster sync + purge, hourly
//! cache cleanup. The scheduler is the single writer of tick events;
//! workers consume in parallel.
//!
//! The fan-out policy itself is a pure function over source rows; the
//! tokio loops only tick and enqueue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use rinkwire_store::SourceRow;

use crate::app::App;
use crate::queue::Task;

const DAILY: Duration = Duration::from_secs(86_400);
const HOURLY: Duration = Duration::from_secs(3_600);

/// Build one tick's fetch fan-out: one first-attempt task per approved
/// source, priority ascending (id breaks ties), skipping sources flagged
/// `skip_fetch` (the reserved user-submissions row).
pub(crate) fn fan_out_tasks(sources: &[SourceRow]) -> Vec<Task> {
    let mut fetchable: Vec<&SourceRow> = sources
        .iter()
        .filter(|s| !s.metadata_flag("skip_fetch"))
        .collect();
    fetchable.sort_by_key(|s| (s.priority, s.id));

    fetchable
        .into_iter()
        .map(|s| Task::FetchSource {
            source_id: s.id,
            attempt: 0,
        })
        .collect()
}

/// Tasks enqueued on the daily tick.
pub(crate) fn daily_tasks() -> [Task; 2] {
    [Task::SyncRoster, Task::PurgeOldData]
}

/// Spawn the periodic loops. Each loop ticks independently; a failing tick
/// never cancels the loop.
pub fn spawn(app: Arc<App>) -> Vec<JoinHandle<()>> {
    let ingest_every = Duration::from_secs(app.config.ingest_interval_minutes * 60);

    let fan_out = {
        let app = app.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ingest_every);
            loop {
                interval.tick().await;
                fan_out_fetches(&app).await;
            }
        })
    };

    let daily = {
        let app = app.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(DAILY);
            loop {
                interval.tick().await;
                for task in daily_tasks() {
                    app.queue.enqueue(task);
                }
            }
        })
    };

    let hourly = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HOURLY);
        loop {
            interval.tick().await;
            app.queue.enqueue(Task::CleanupFeedCache);
        }
    });

    vec![fan_out, daily, hourly]
}

/// One fetch task per eligible source. A failure to list sources skips the
/// tick; it never brings the loop down.
async fn fan_out_fetches(app: &App) {
    match app.store.approved_sources().await {
        Ok(sources) => {
            let tasks = fan_out_tasks(&sources);
            info!(count = tasks.len(), "fetch fan-out");
            for task in tasks {
                app.queue.enqueue(task);
            }
        }
        Err(e) => error!(error = %e, "fetch fan-out failed to list sources"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_source(id: i64, priority: i32, metadata: serde_json::Value) -> SourceRow {
        SourceRow {
            id,
            name: format!("source-{id}"),
            category: "press".to_string(),
            ingest_method: "rss".to_string(),
            base_url: "https://example.com".to_string(),
            feed_url: Some("https://example.com/feed".to_string()),
            status: "approved".to_string(),
            priority,
            last_fetched_at: None,
            fetch_error_count: 0,
            metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn one_first_attempt_task_per_source() {
        let sources = vec![
            make_source(1, 100, serde_json::json!({})),
            make_source(2, 100, serde_json::json!({})),
        ];
        let tasks = fan_out_tasks(&sources);
        assert_eq!(tasks.len(), 2);
        for task in &tasks {
            assert!(matches!(task, Task::FetchSource { attempt: 0, .. }));
        }
    }

    #[test]
    fn skip_fetch_sources_are_excluded() {
        let sources = vec![
            make_source(1, 100, serde_json::json!({})),
            make_source(2, 1000, serde_json::json!({"key": "user-submissions", "skip_fetch": true})),
        ];
        let tasks = fan_out_tasks(&sources);
        assert_eq!(
            tasks,
            vec![Task::FetchSource {
                source_id: 1,
                attempt: 0
            }]
        );
    }

    #[test]
    fn fan_out_orders_by_priority_then_id() {
        let sources = vec![
            make_source(5, 200, serde_json::json!({})),
            make_source(9, 10, serde_json::json!({})),
            make_source(3, 200, serde_json::json!({})),
        ];
        let tasks = fan_out_tasks(&sources);
        let ids: Vec<i64> = tasks
            .iter()
            .map(|t| match t {
                Task::FetchSource { source_id, .. } => *source_id,
                other => panic!("unexpected task {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }

    #[test]
    fn empty_source_list_fans_out_nothing() {
        assert!(fan_out_tasks(&[]).is_empty());
    }

    #[test]
    fn daily_tick_runs_roster_sync_and_purge() {
        assert_eq!(daily_tasks(), [Task::SyncRoster, Task::PurgeOldData]);
    }
}
