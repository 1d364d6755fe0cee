//! Observation storage.
//!
//! The analytics core never writes observations; the extraction pipeline appends them
//! through the ingestion endpoint and the service reads them back per version and window.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::analytics::Observation;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryObservationStore;
pub use postgres::PostgresObservationStore;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned back into an observation
    #[error("Invalid stored observation {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// Append-only log of observations, queryable by prompt version.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Record one observation.
    async fn append(&self, observation: &Observation) -> Result<()>;

    /// All observations for `version` recorded at or after `since`, in no particular order.
    async fn query(&self, version: &str, since: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Distinct prompt versions with at least one observation, newest version first
    /// (see [`newest_version_first`]).
    async fn versions(&self) -> Result<Vec<String>>;
}

/// Ordering for prompt version labels, newest first.
///
/// Numeric components are compared as numbers, so `v10.0.0` comes before `v9.1.0`. Labels
/// without digits sort after numbered ones; remaining ties fall back to reverse string order.
pub fn newest_version_first(a: &str, b: &str) -> Ordering {
    version_components(b)
        .cmp(&version_components(a))
        .then_with(|| b.cmp(a))
}

fn version_components(version: &str) -> Vec<u64> {
    version
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|part| part.parse().ok())
        .collect()
}
