/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("Source {0} is not fetchable: {1}")]
    NotFetchable(i64, String),

    #[error("Database error: {0}")]
    Store(#[from] rinkwire_store::StoreError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
