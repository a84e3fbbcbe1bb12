//! In-process task queue: a closed task enum, an unbounded channel, and a
//! pool of workers applying the per-task time limits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::app::App;
use crate::tasks;

/// Units of work. Fetch tasks carry their retry attempt so backoff can
/// escalate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    FetchSource { source_id: i64, attempt: u32 },
    Enrich { raw_item_id: i64 },
    ProcessSubmission { submission_id: i64 },
    SyncRoster,
    PurgeOldData,
    CleanupFeedCache,
}

impl Task {
    pub fn describe(&self) -> String {
        match self {
            Task::FetchSource { source_id, attempt } => {
                format!("fetch_source({source_id}, attempt {attempt})")
            }
            Task::Enrich { raw_item_id } => format!("enrich({raw_item_id})"),
            Task::ProcessSubmission { submission_id } => {
                format!("process_submission({submission_id})")
            }
            Task::SyncRoster => "sync_roster".to_string(),
            Task::PurgeOldData => "purge_old_data".to_string(),
            Task::CleanupFeedCache => "cleanup_feed_cache".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, task: Task) {
        if self.tx.send(task).is_err() {
            warn!("task queue closed, task dropped");
        }
    }
}

/// Spawn the worker pool. Workers pull from the shared receiver and run
/// tasks under the configured soft/hard time limits; a worker never dies on
/// a task failure.
pub fn spawn_workers(
    app: Arc<App>,
    rx: mpsc::UnboundedReceiver<Task>,
    concurrency: usize,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));

    (0..concurrency)
        .map(|worker_id| {
            let app = app.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let task = { rx.lock().await.recv().await };
                    let Some(task) = task else {
                        debug!(worker_id, "queue closed, worker exiting");
                        break;
                    };
                    run_with_limits(&app, task).await;
                }
            })
        })
        .collect()
}

/// Run one task with a soft-limit warning and a hard kill.
async fn run_with_limits(app: &App, task: Task) {
    let soft = Duration::from_secs(app.config.task_soft_time_limit_seconds);
    let hard = Duration::from_secs(app.config.task_time_limit_seconds);
    let label = task.describe();

    let task_future = tasks::execute(app, task);
    tokio::pin!(task_future);

    let soft_sleep = tokio::time::sleep(soft);
    tokio::pin!(soft_sleep);
    let hard_sleep = tokio::time::sleep(hard);
    tokio::pin!(hard_sleep);

    let mut soft_warned = false;

    loop {
        tokio::select! {
            result = &mut task_future => {
                match result {
                    Ok(()) => debug!(task = %label, "task complete"),
                    Err(e) => error!(task = %label, error = %e, "task failed"),
                }
                return;
            }
            _ = &mut soft_sleep, if !soft_warned => {
                soft_warned = true;
                warn!(task = %label, "task exceeded soft time limit");
            }
            _ = &mut hard_sleep => {
                error!(task = %label, "task exceeded hard time limit, abandoned");
                return;
            }
        }
    }
}
