//! Per-worker handle to the Ollama client.
//!
//! The client is constructed lazily on first use and dropped on any failed
//! relevance call, so the next call rebuilds a fresh connection instead of
//! reusing a wedged one.

use std::sync::Arc;
use std::time::Duration;

use ollama_client::OllamaClient;
use rinkwire_common::Config;
use tokio::sync::Mutex;
use tracing::warn;

pub struct LlmHandle {
    base_url: String,
    model: String,
    timeout: Duration,
    enabled: bool,
    inner: Mutex<Option<Arc<OllamaClient>>>,
}

impl LlmHandle {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.ollama_base_url.clone(),
            model: config.ollama_model.clone(),
            timeout: Duration::from_secs(config.ollama_timeout_seconds),
            enabled: config.llm_relevance_enabled || config.llm_evaluation_mode,
            inner: Mutex::new(None),
        }
    }

    /// The current client, constructing it on first use. `None` when the
    /// LLM is disabled or construction fails (the relevance filter then
    /// falls back to keywords).
    pub async fn get(&self) -> Option<Arc<OllamaClient>> {
        if !self.enabled {
            return None;
        }

        let mut guard = self.inner.lock().await;
        if guard.is_none() {
            match OllamaClient::new(&self.base_url, &self.model, self.timeout) {
                Ok(client) => *guard = Some(Arc::new(client)),
                Err(e) => {
                    warn!(error = %e, "failed to construct Ollama client");
                    return None;
                }
            }
        }
        guard.clone()
    }

    /// Drop the client after a failure; the next `get` rebuilds it.
    pub async fn reset(&self) {
        *self.inner.lock().await = None;
    }
}
