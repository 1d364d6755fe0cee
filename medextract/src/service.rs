//! Glue between the observation store and the analytics engines.
//!
//! This is the only place that reads the wall clock: it turns a `days` window into a
//! `since` timestamp, fetches each version's observations and hands them to the engines.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    analytics::{
        AnalyticsError, ComparisonConfig, ComparisonEngine, ComparisonResult, MetricsEngine, Observation, ObservationDraft,
        PromptMetricsSummary, SummaryConfig,
    },
    errors::{Error, Result},
    store::ObservationStore,
};

/// Bounds of the look-back window for summary and comparison queries.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Window used when a query omits `days`
    pub default_days: u32,
    /// Largest accepted `days`
    pub max_days: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_days: 7,
            max_days: 90,
        }
    }
}

impl WindowConfig {
    fn resolve(&self, days: Option<u32>) -> std::result::Result<u32, AnalyticsError> {
        let days = days.unwrap_or(self.default_days);
        if days == 0 || days > self.max_days {
            return Err(AnalyticsError::validation(format!(
                "days must be between 1 and {}, got {days}",
                self.max_days
            )));
        }
        Ok(days)
    }
}

/// Summary, comparison and ingestion operations over one observation store.
pub struct AnalyticsService {
    store: Arc<dyn ObservationStore>,
    metrics: MetricsEngine,
    comparison: ComparisonEngine,
    window: WindowConfig,
    default_version: String,
}

impl AnalyticsService {
    pub fn new(
        store: Arc<dyn ObservationStore>,
        summary: SummaryConfig,
        comparison: ComparisonConfig,
        window: WindowConfig,
        default_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            metrics: MetricsEngine::new(summary),
            comparison: ComparisonEngine::new(comparison),
            window,
            default_version: default_version.into(),
        }
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn metrics_engine(&self) -> &MetricsEngine {
        &self.metrics
    }

    /// Validate an incoming observation, fill defaults and append it.
    #[instrument(skip_all, err)]
    pub async fn record(&self, draft: ObservationDraft) -> Result<Observation> {
        let observation = draft.into_observation(&self.default_version, Utc::now())?;

        let expected = self.metrics.config().total_expected_fields;
        if observation.fields_extracted > expected {
            return Err(AnalyticsError::validation(format!(
                "fields_extracted ({}) exceeds the schema size ({expected})",
                observation.fields_extracted
            ))
            .into());
        }
        // Unpriced models are rejected here so they never reach a summary
        self.metrics.observation_cost(&observation).map_err(|err| match err {
            AnalyticsError::UnknownModel { model } => AnalyticsError::validation(format!("No pricing configured for model '{model}'")),
            other => other,
        })?;

        self.store.append(&observation).await?;
        debug!(
            prompt_version = %observation.prompt_version,
            success = observation.success,
            "Recorded observation {}",
            observation.id
        );
        Ok(observation)
    }

    /// Summary for `version` over the last `days` days.
    #[instrument(skip(self), err)]
    pub async fn prompt_summary(&self, version: &str, days: Option<u32>) -> Result<PromptMetricsSummary> {
        let since = self.since(days, Utc::now())?;
        self.summary_since(version, since).await
    }

    /// Compare two versions over the last `days` days.
    ///
    /// A version with no observations in the window yields [`AnalyticsError::InsufficientData`].
    #[instrument(skip(self), err)]
    pub async fn compare(
        &self,
        control_version: &str,
        treatment_version: &str,
        confidence_level: Option<f64>,
        days: Option<u32>,
    ) -> Result<ComparisonResult> {
        let since = self.since(days, Utc::now())?;

        let control = self.summary_since(control_version, since).await.map_err(insufficient)?;
        let treatment = self.summary_since(treatment_version, since).await.map_err(insufficient)?;

        let result = self.comparison.compare(&control, &treatment, confidence_level)?;
        info!(
            control = control_version,
            treatment = treatment_version,
            decision = %result.decision,
            "Compared prompt versions"
        );
        Ok(result)
    }

    /// Prompt versions with recorded observations, newest first.
    pub async fn versions(&self) -> Result<Vec<String>> {
        Ok(self.store.versions().await?)
    }

    async fn summary_since(&self, version: &str, since: DateTime<Utc>) -> Result<PromptMetricsSummary> {
        let observations = self.store.query(version, since).await?;
        if observations.is_empty() {
            warn!("No data found for prompt version {version} since {since}");
        }
        Ok(self.metrics.summarize(version, &observations)?)
    }

    fn since(&self, days: Option<u32>, now: DateTime<Utc>) -> std::result::Result<DateTime<Utc>, AnalyticsError> {
        let days = self.window.resolve(days)?;
        Ok(now - Duration::days(i64::from(days)))
    }
}

/// An empty arm is a missing precondition for comparison, not a missing resource.
fn insufficient(err: Error) -> Error {
    match err {
        Error::Analytics(AnalyticsError::NotFound { version }) => Error::Analytics(AnalyticsError::InsufficientData { version }),
        other => other,
    }
}
