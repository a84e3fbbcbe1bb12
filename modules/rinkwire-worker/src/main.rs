use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rinkwire_common::Config;
use rinkwire_store::Store;
use rinkwire_worker::{queue, scheduler, App, TaskQueue};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rinkwire=info".parse()?))
        .init();

    info!("rinkwire worker starting");

    let config = Config::from_env();
    config.log_redacted();

    let store = Store::connect(&config.database_url).await?;
    store.migrate().await?;

    let (task_queue, rx) = TaskQueue::new();
    let concurrency = config.worker_concurrency;
    let app = Arc::new(App::new(config, store, task_queue)?);

    // Surface LLM availability early; the filter fails open either way.
    if let Some(llm) = app.llm.get().await {
        if llm.health_check().await {
            info!("Ollama reachable");
        } else {
            info!("Ollama unreachable, relevance will fail open");
        }
    }

    let workers = queue::spawn_workers(app.clone(), rx, concurrency);
    let loops = scheduler::spawn(app);

    info!(workers = workers.len(), "worker pool running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    for handle in loops {
        handle.abort();
    }

    Ok(())
}
