//! In-memory observation store.
//!
//! Suitable for tests and single-process demos. Observations are lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use super::{ObservationStore, Result, newest_version_first};
use crate::analytics::Observation;

/// Observations sharded by prompt version.
#[derive(Clone, Default)]
pub struct InMemoryObservationStore {
    by_version: Arc<DashMap<String, Vec<Observation>>>,
}

impl InMemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored observations across all versions.
    pub fn len(&self) -> usize {
        self.by_version.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObservationStore for InMemoryObservationStore {
    async fn append(&self, observation: &Observation) -> Result<()> {
        self.by_version
            .entry(observation.prompt_version.clone())
            .or_default()
            .push(observation.clone());
        Ok(())
    }

    async fn query(&self, version: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        Ok(self
            .by_version
            .get(version)
            .map(|entry| entry.iter().filter(|obs| obs.timestamp >= since).cloned().collect())
            .unwrap_or_default())
    }

    async fn versions(&self) -> Result<Vec<String>> {
        let mut versions: Vec<String> = self.by_version.iter().map(|entry| entry.key().clone()).collect();
        versions.sort_unstable_by(|a, b| newest_version_first(a, b));
        Ok(versions)
    }
}
