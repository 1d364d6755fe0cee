//! Test utilities for integration testing (available with `test-utils` feature).

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    analytics::Observation,
    config::Config,
    store::{InMemoryObservationStore, ObservationStore},
};

/// Default configuration with an in-memory store and metrics enabled
pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        enable_metrics: true,
        ..Default::default()
    }
}

/// Test server over a fresh in-memory store. The store handle is returned for seeding.
pub fn create_test_app() -> (TestServer, InMemoryObservationStore) {
    create_test_app_with_config(create_test_config())
}

pub fn create_test_app_with_config(config: Config) -> (TestServer, InMemoryObservationStore) {
    let store = InMemoryObservationStore::new();
    let app = crate::Application::new_with_store(config, Arc::new(store.clone())).expect("Failed to create application");
    (app.into_test_server(), store)
}

/// Append `n` observations for `version`, the first `successes` of them successful.
///
/// Every observation uses the default model with 1500 input and 350 output tokens, so arms
/// seeded with this helper have identical per-request cost.
pub async fn seed_observations(store: &InMemoryObservationStore, version: &str, n: usize, successes: usize) {
    for i in 0..n {
        let success = i < successes;
        store
            .append(&Observation {
                id: Uuid::new_v4(),
                prompt_version: version.to_string(),
                model_id: None,
                success,
                processing_time_ms: Some(500 + 10 * i as u64),
                input_tokens: 1500,
                output_tokens: 350,
                fields_extracted: if success { 8 } else { 0 },
                timestamp: Utc::now(),
            })
            .await
            .expect("Failed to seed observation");
    }
}
