//! Shared service handles threaded into every task.

use std::time::Duration;

use anyhow::Result;

use rinkwire_cluster::Clusterer;
use rinkwire_common::Config;
use rinkwire_ingest::{Fetcher, RosterSync, SubmissionProcessor, USER_AGENT};
use rinkwire_store::Store;

use crate::llm::LlmHandle;
use crate::queue::TaskQueue;

pub struct App {
    pub config: Config,
    pub store: Store,
    pub fetcher: Fetcher,
    pub submissions: SubmissionProcessor,
    pub roster: RosterSync,
    pub clusterer: Clusterer,
    pub llm: LlmHandle,
    pub queue: TaskQueue,
}

impl App {
    pub fn new(config: Config, store: Store, queue: TaskQueue) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            fetcher: Fetcher::new(store.clone(), timeout)?,
            submissions: SubmissionProcessor::new(store.clone(), http.clone()),
            roster: RosterSync::new(store.clone(), http),
            clusterer: Clusterer::new(store.clone(), &config),
            llm: LlmHandle::from_config(&config),
            config,
            store,
            queue,
        })
    }
}
