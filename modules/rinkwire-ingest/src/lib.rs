//! Ingestion: fetchers for RSS/HTML/API sources, feed discovery, article
//! metadata extraction, submission processing, and roster sync.

pub mod api;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod html;
pub mod metadata;
pub mod roster;
pub mod rss;
pub mod sanitize;
pub mod submission;

pub use error::{IngestError, Result};
pub use fetch::{FetchReport, FetchedItem, Fetcher};
pub use roster::{RosterStats, RosterSync};
pub use submission::{SubmissionOutcome, SubmissionProcessor};

/// User agent presented to every upstream server.
pub const USER_AGENT: &str = "rinkwire/0.1";
