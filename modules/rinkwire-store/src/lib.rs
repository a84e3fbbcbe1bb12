//! Postgres persistence for the aggregation pipeline.
//!
//! One `Store` handle wraps the pool; queries are grouped by concern
//! (sources/entities/tags, raw items and variants, clusters, submissions,
//! maintenance). All uniqueness invariants live in the schema; races on
//! unique constraints surface as the duplicate path, never as task failures.

pub mod error;
pub mod rows;

mod clusters;
mod items;
mod maintenance;
mod store;
mod submissions;

#[cfg(any(test, feature = "test-support"))]
pub mod testutil;

pub use clusters::NewCluster;
pub use error::{is_unique_violation, Result, StoreError};
pub use items::{NewRawItem, NewStoryVariant, NewValidationLog};
pub use rows::*;
pub use store::{NewSource, Store};
pub use submissions::NewCandidateSource;
