//! Metrics engine: one prompt version's observations in, one summary out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::{AnalyticsError, Result},
    observation::{Observation, TOTAL_EXPECTED_FIELDS},
    pricing::{CLAUDE_3_HAIKU, PricingTable},
    stats,
};

/// Aggregated statistics for one prompt version over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMetricsSummary {
    pub prompt_version: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percentage in `[0, 100]`
    pub success_rate: f64,

    pub avg_processing_time_ms: f64,
    pub p50_processing_time_ms: u64,
    pub p95_processing_time_ms: u64,
    pub p99_processing_time_ms: u64,

    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
    pub avg_cost_per_request: f64,

    /// Percentage in `[0, 100]`, over successful observations only
    pub avg_field_completeness: f64,
    pub avg_fields_extracted: f64,

    pub first_request: DateTime<Utc>,
    pub last_request: DateTime<Utc>,
}

/// Injectable settings for [`MetricsEngine`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// Size of the extraction schema used as the completeness denominator
    pub total_expected_fields: u32,
    /// Model charged for observations that do not name one
    pub default_model: String,
    pub pricing: PricingTable,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            total_expected_fields: TOTAL_EXPECTED_FIELDS,
            default_model: CLAUDE_3_HAIKU.to_string(),
            pricing: PricingTable::default(),
        }
    }
}

impl SummaryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.total_expected_fields == 0 {
            return Err(AnalyticsError::validation("total_expected_fields must be at least 1"));
        }
        self.pricing.validate()?;
        // Surface a misconfigured default at startup rather than on the first query
        self.pricing.get(&self.default_model)?;
        Ok(())
    }
}

/// Computes [`PromptMetricsSummary`] values. Stateless apart from its configuration.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: SummaryConfig,
}

impl MetricsEngine {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Cost in USD of a single observation.
    pub fn observation_cost(&self, observation: &Observation) -> Result<f64> {
        let model = observation.model_id.as_deref().unwrap_or(&self.config.default_model);
        self.config.pricing.cost(model, observation.input_tokens, observation.output_tokens)
    }

    /// Summarize `observations`, which must all belong to `version`.
    ///
    /// The caller is responsible for the time-window filter. Input order does not matter.
    ///
    /// # Errors
    /// - [`AnalyticsError::NotFound`] when `observations` is empty
    /// - [`AnalyticsError::VersionMismatch`] when an observation belongs to another version
    /// - [`AnalyticsError::Validation`] when `fields_extracted` exceeds the schema size or a
    ///   token total overflows
    /// - [`AnalyticsError::UnknownModel`] when an observation's model has no pricing
    pub fn summarize(&self, version: &str, observations: &[Observation]) -> Result<PromptMetricsSummary> {
        if observations.is_empty() {
            return Err(AnalyticsError::NotFound {
                version: version.to_string(),
            });
        }

        let expected_fields = self.config.total_expected_fields;
        let mut timings = Vec::with_capacity(observations.len());
        let mut successful = Vec::with_capacity(observations.len());
        let (mut input_tokens, mut output_tokens) = (0u64, 0u64);
        let mut total_cost = 0.0;
        let mut first_request = observations[0].timestamp;
        let mut last_request = observations[0].timestamp;

        for obs in observations {
            if obs.prompt_version != version {
                return Err(AnalyticsError::VersionMismatch {
                    expected: version.to_string(),
                    found: obs.prompt_version.clone(),
                });
            }
            if obs.fields_extracted > expected_fields {
                return Err(AnalyticsError::validation(format!(
                    "observation {} reports {} fields extracted but the schema has {}",
                    obs.id, obs.fields_extracted, expected_fields
                )));
            }

            if let Some(ms) = obs.processing_time_ms {
                timings.push(ms);
            }
            if obs.success {
                successful.push(obs);
            }
            input_tokens = checked_total("input_tokens", input_tokens, obs.input_tokens)?;
            output_tokens = checked_total("output_tokens", output_tokens, obs.output_tokens)?;
            total_cost += self.observation_cost(obs)?;
            first_request = first_request.min(obs.timestamp);
            last_request = last_request.max(obs.timestamp);
        }

        timings.sort_unstable();
        let percentile = |p| stats::nearest_rank(&timings, p).unwrap_or(0);

        let total = observations.len() as u64;
        let succeeded = successful.len() as u64;

        Ok(PromptMetricsSummary {
            prompt_version: version.to_string(),
            total_requests: total,
            successful_requests: succeeded,
            failed_requests: total - succeeded,
            success_rate: rate(succeeded, total),

            avg_processing_time_ms: stats::mean(timings.iter().map(|&ms| ms as f64)),
            p50_processing_time_ms: percentile(50.0),
            p95_processing_time_ms: percentile(95.0),
            p99_processing_time_ms: percentile(99.0),

            total_input_tokens: input_tokens,
            total_output_tokens: output_tokens,
            total_cost_usd: total_cost,
            avg_cost_per_request: total_cost / total as f64,

            avg_field_completeness: stats::mean(
                successful
                    .iter()
                    .map(|obs| obs.fields_extracted as f64 / expected_fields as f64 * 100.0),
            ),
            avg_fields_extracted: stats::mean(successful.iter().map(|obs| obs.fields_extracted as f64)),

            first_request,
            last_request,
        })
    }
}

fn checked_total(field: &str, total: u64, value: u64) -> Result<u64> {
    total
        .checked_add(value)
        .ok_or_else(|| AnalyticsError::validation(format!("total {field} overflows a 64-bit counter")))
}

/// `part / total * 100`, defined as 0 for an empty total.
fn rate(part: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 * 100.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::pricing::{CLAUDE_3_SONNET, ModelPricing};
    use chrono::Duration;
    use uuid::Uuid;

    fn base_time() -> DateTime<Utc> {
        "2026-03-01T00:00:00Z".parse().unwrap()
    }

    fn obs(version: &str, success: bool, ms: Option<u64>, tokens: (u64, u64), fields: u32, minute: i64) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            prompt_version: version.to_string(),
            model_id: None,
            success,
            processing_time_ms: ms,
            input_tokens: tokens.0,
            output_tokens: tokens.1,
            fields_extracted: fields,
            timestamp: base_time() + Duration::minutes(minute),
        }
    }

    #[test]
    fn test_empty_input_is_not_found() {
        let err = MetricsEngine::default().summarize("v9.9.9", &[]).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::NotFound {
                version: "v9.9.9".to_string()
            }
        );
    }

    #[test]
    fn test_percentiles_of_three_timings() {
        let observations = vec![
            obs("v1", true, Some(300), (0, 0), 9, 0),
            obs("v1", true, Some(100), (0, 0), 9, 1),
            obs("v1", true, Some(200), (0, 0), 9, 2),
        ];
        let summary = MetricsEngine::default().summarize("v1", &observations).unwrap();
        assert_eq!(summary.p50_processing_time_ms, 200);
        assert_eq!(summary.p95_processing_time_ms, 300);
        assert_eq!(summary.p99_processing_time_ms, 300);
        assert_eq!(summary.avg_processing_time_ms, 200.0);
    }

    #[test]
    fn test_counts_and_success_rate() {
        let observations = vec![
            obs("v1", true, Some(100), (10, 5), 9, 0),
            obs("v1", true, Some(120), (10, 5), 9, 1),
            obs("v1", true, Some(140), (10, 5), 9, 2),
            obs("v1", false, None, (10, 0), 0, 3),
        ];
        let summary = MetricsEngine::default().summarize("v1", &observations).unwrap();
        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.successful_requests, 3);
        assert_eq!(summary.failed_requests, 1);
        assert_eq!(summary.success_rate, 75.0);
        assert!((0.0..=100.0).contains(&summary.success_rate));
    }

    #[test]
    fn test_failures_contribute_tokens_but_not_completeness() {
        let observations = vec![
            obs("v1", true, Some(100), (1000, 200), 9, 0),
            obs("v1", true, Some(100), (1000, 200), 3, 1),
            obs("v1", false, Some(50), (500, 0), 0, 2),
        ];
        let summary = MetricsEngine::default().summarize("v1", &observations).unwrap();

        assert_eq!(summary.total_input_tokens, 2500);
        assert_eq!(summary.total_output_tokens, 400);
        // (100 + 33.33..) / 2; the failed observation's zero is excluded
        assert!((summary.avg_field_completeness - (100.0 + 3.0 / 9.0 * 100.0) / 2.0).abs() < 1e-9);
        assert_eq!(summary.avg_fields_extracted, 6.0);
        // Timing is present on the failure, so it counts towards latency
        assert!((summary.avg_processing_time_ms - 250.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_failures_have_zero_completeness() {
        let observations = vec![obs("v1", false, None, (100, 0), 0, 0), obs("v1", false, None, (100, 0), 0, 1)];
        let summary = MetricsEngine::default().summarize("v1", &observations).unwrap();
        assert_eq!(summary.success_rate, 0.0);
        assert_eq!(summary.avg_field_completeness, 0.0);
        assert_eq!(summary.avg_fields_extracted, 0.0);
        assert_eq!(summary.avg_processing_time_ms, 0.0);
        assert_eq!(summary.p50_processing_time_ms, 0);
        assert_eq!(summary.p99_processing_time_ms, 0);
    }

    #[test]
    fn test_total_cost_is_sum_of_observation_costs() {
        let engine = MetricsEngine::default();
        let mut observations: Vec<Observation> = (0..37u64)
            .map(|i| obs("v1", i % 5 != 0, Some(100 + i), (1000 + i * 37, 150 + i * 11), 7, i as i64))
            .collect();
        observations[3].model_id = Some(CLAUDE_3_SONNET.to_string());

        let summary = engine.summarize("v1", &observations).unwrap();
        let expected: f64 = observations.iter().map(|o| engine.observation_cost(o).unwrap()).sum();

        assert!((summary.total_cost_usd - expected).abs() < 1e-9);
        assert!((summary.avg_cost_per_request - expected / 37.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_is_an_error() {
        let mut o = obs("v1", true, Some(100), (100, 100), 9, 0);
        o.model_id = Some("mystery-model".to_string());
        let err = MetricsEngine::default().summarize("v1", &[o]).unwrap_err();
        assert!(matches!(err, AnalyticsError::UnknownModel { .. }));
    }

    #[test]
    fn test_custom_pricing_regime() {
        let engine = MetricsEngine::new(SummaryConfig {
            total_expected_fields: 4,
            default_model: "flat".to_string(),
            pricing: PricingTable::new([(
                "flat".to_string(),
                ModelPricing {
                    input_per_1k: 1.0,
                    output_per_1k: 2.0,
                },
            )]),
        });
        let summary = engine
            .summarize("v1", &[obs("v1", true, Some(10), (1000, 1000), 2, 0)])
            .unwrap();
        assert!((summary.total_cost_usd - 3.0).abs() < 1e-12);
        assert_eq!(summary.avg_field_completeness, 50.0);
    }

    #[test]
    fn test_mixed_versions_are_rejected() {
        let observations = vec![obs("v1", true, Some(1), (0, 0), 1, 0), obs("v2", true, Some(1), (0, 0), 1, 1)];
        let err = MetricsEngine::default().summarize("v1", &observations).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::VersionMismatch {
                expected: "v1".to_string(),
                found: "v2".to_string()
            }
        );
    }

    #[test]
    fn test_field_count_above_schema_is_rejected() {
        let err = MetricsEngine::default()
            .summarize("v1", &[obs("v1", true, Some(1), (0, 0), 10, 0)])
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation { .. }));
    }

    #[test]
    fn test_token_total_overflow_is_rejected() {
        let observations = vec![
            obs("v1", true, Some(1), (i64::MAX as u64, 0), 9, 0),
            obs("v1", true, Some(1), (i64::MAX as u64, 0), 9, 1),
            obs("v1", true, Some(1), (i64::MAX as u64, 0), 9, 2),
        ];
        let err = MetricsEngine::default().summarize("v1", &observations).unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation { .. }), "{err:?}");

        let output = vec![obs("v1", true, Some(1), (0, u64::MAX), 9, 0), obs("v1", true, Some(1), (0, 1), 9, 1)];
        assert!(matches!(
            MetricsEngine::default().summarize("v1", &output),
            Err(AnalyticsError::Validation { .. })
        ));
    }

    #[test]
    fn test_time_range_and_order_independence() {
        let mut observations: Vec<Observation> = (0..20).map(|i| obs("v1", true, Some((i * 7 % 13) as u64), (5, 5), 9, i)).collect();
        let forward = MetricsEngine::default().summarize("v1", &observations).unwrap();
        observations.reverse();
        let backward = MetricsEngine::default().summarize("v1", &observations).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.first_request, base_time());
        assert_eq!(forward.last_request, base_time() + Duration::minutes(19));
    }

    #[test]
    fn test_summary_config_validation() {
        assert!(SummaryConfig::default().validate().is_ok());

        let missing_default = SummaryConfig {
            default_model: "nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(missing_default.validate(), Err(AnalyticsError::UnknownModel { .. })));

        let no_fields = SummaryConfig {
            total_expected_fields: 0,
            ..Default::default()
        };
        assert!(no_fields.validate().is_err());
    }
}
