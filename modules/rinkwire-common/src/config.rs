use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Ingestion
    pub ingest_interval_minutes: u64,
    pub max_fetch_retries: u32,
    pub request_timeout_seconds: u64,

    // Clustering
    pub cluster_time_window_hours: i64,
    pub cluster_similarity_threshold: f64,
    pub entity_overlap_threshold: f64,
    pub token_similarity_threshold: f64,

    // Submissions
    pub submission_rate_limit_per_ip: i64,

    // Relevance filter (Ollama)
    pub llm_relevance_enabled: bool,
    /// Shadow mode: keyword decides, LLM evaluated for comparison.
    pub llm_evaluation_mode: bool,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_timeout_seconds: u64,

    /// Keywords establishing topical context (team name, arena, affiliate).
    pub topic_keywords: Vec<String>,

    /// Upstream roster page for entity sync. Sync is skipped when unset.
    pub roster_url: Option<String>,

    // Task runner
    pub worker_concurrency: usize,
    pub task_time_limit_seconds: u64,
    pub task_soft_time_limit_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            ingest_interval_minutes: env_parse("INGEST_INTERVAL_MINUTES", 10),
            max_fetch_retries: env_parse("MAX_FETCH_RETRIES", 3),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS", 30),
            cluster_time_window_hours: env_parse("CLUSTER_TIME_WINDOW_HOURS", 72),
            cluster_similarity_threshold: env_parse("CLUSTER_SIMILARITY_THRESHOLD", 0.62),
            entity_overlap_threshold: env_parse("ENTITY_OVERLAP_THRESHOLD", 0.50),
            token_similarity_threshold: env_parse("TOKEN_SIMILARITY_THRESHOLD", 0.40),
            submission_rate_limit_per_ip: env_parse("SUBMISSION_RATE_LIMIT_PER_IP", 10),
            llm_relevance_enabled: env_parse("LLM_RELEVANCE_ENABLED", true),
            llm_evaluation_mode: env_parse("LLM_EVALUATION_MODE", false),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            ollama_model: env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| "qwen2.5-instruct:1.5b".to_string()),
            ollama_timeout_seconds: env_parse("OLLAMA_TIMEOUT_SECONDS", 30),
            topic_keywords: env::var("TOPIC_KEYWORDS")
                .unwrap_or_else(|_| "sharks,sj sharks,san jose,barracuda,sap center".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            roster_url: env::var("ROSTER_URL").ok().filter(|s| !s.is_empty()),
            worker_concurrency: env_parse("WORKER_CONCURRENCY", 4),
            task_time_limit_seconds: env_parse("TASK_TIME_LIMIT_SECONDS", 3600),
            task_soft_time_limit_seconds: env_parse("TASK_SOFT_TIME_LIMIT_SECONDS", 3000),
        }
    }

    /// Log configuration without leaking credentials.
    pub fn log_redacted(&self) {
        tracing::info!("DATABASE_URL = ({} chars)", self.database_url.len());
        tracing::info!(
            ingest_interval_minutes = self.ingest_interval_minutes,
            worker_concurrency = self.worker_concurrency,
            llm_relevance_enabled = self.llm_relevance_enabled,
            llm_evaluation_mode = self.llm_evaluation_mode,
            ollama_base_url = %self.ollama_base_url,
            "config loaded"
        );
    }
}

impl Default for Config {
    /// Defaults for tests: no database, every knob at its documented default.
    fn default() -> Self {
        Self {
            database_url: String::new(),
            ingest_interval_minutes: 10,
            max_fetch_retries: 3,
            request_timeout_seconds: 30,
            cluster_time_window_hours: 72,
            cluster_similarity_threshold: 0.62,
            entity_overlap_threshold: 0.50,
            token_similarity_threshold: 0.40,
            submission_rate_limit_per_ip: 10,
            llm_relevance_enabled: true,
            llm_evaluation_mode: false,
            ollama_base_url: "http://localhost:8000".to_string(),
            ollama_model: "qwen2.5-instruct:1.5b".to_string(),
            ollama_timeout_seconds: 30,
            topic_keywords: ["sharks", "sj sharks", "san jose", "barracuda", "sap center"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            roster_url: None,
            worker_concurrency: 4,
            task_time_limit_seconds: 3600,
            task_soft_time_limit_seconds: 3000,
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
