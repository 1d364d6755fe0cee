//! Comparison engine: control vs. treatment prompt versions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    errors::{AnalyticsError, Result},
    stats,
    summary::PromptMetricsSummary,
};

/// How `is_significant` is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificancePolicy {
    /// Both arms reach `min_sample_size`. No hypothesis test; `confidence_level` is reported only.
    #[default]
    SampleSize,
    /// Sample-size floor plus a two-proportion z-test on success rate at `confidence_level`.
    SampleSizeAndZTest,
}

/// Thresholds for the comparison. All of them are configuration, none are literals in the rules.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparisonConfig {
    /// Observations required in each arm before a decision is made
    pub min_sample_size: u64,
    /// Success-rate gain (percentage points) required to promote
    pub min_improvement_pp: f64,
    /// Largest acceptable cost increase (percent of control cost) for promotion
    pub max_cost_increase_pct: f64,
    /// Success-rate loss (percentage points) tolerated before keeping control
    pub max_regression_pp: f64,
    pub significance: SignificancePolicy,
    pub default_confidence_level: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 30,
            min_improvement_pp: 5.0,
            max_cost_increase_pct: 15.0,
            max_regression_pp: 0.0,
            significance: SignificancePolicy::SampleSize,
            default_confidence_level: 0.95,
        }
    }
}

impl ComparisonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_sample_size == 0 {
            return Err(AnalyticsError::validation("min_sample_size must be at least 1"));
        }
        if !(self.min_improvement_pp.is_finite() && self.min_improvement_pp > 0.0) {
            return Err(AnalyticsError::validation("min_improvement_pp must be positive"));
        }
        if !(self.max_cost_increase_pct.is_finite() && self.max_regression_pp.is_finite()) {
            return Err(AnalyticsError::validation("comparison thresholds must be finite"));
        }
        if self.max_regression_pp < 0.0 {
            return Err(AnalyticsError::validation("max_regression_pp must be non-negative"));
        }
        validate_confidence_level(self.default_confidence_level)
    }
}

pub const MIN_CONFIDENCE_LEVEL: f64 = 0.5;
pub const MAX_CONFIDENCE_LEVEL: f64 = 0.99;

pub fn validate_confidence_level(level: f64) -> Result<()> {
    if (MIN_CONFIDENCE_LEVEL..=MAX_CONFIDENCE_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(AnalyticsError::validation(format!(
            "confidence_level must be between {MIN_CONFIDENCE_LEVEL} and {MAX_CONFIDENCE_LEVEL}, got {level}"
        )))
    }
}

/// The closed set of outcomes. Exactly one applies to any pair of summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Promote,
    Review,
    KeepControl,
    InsufficientData,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Decision::Promote => "PROMOTE",
            Decision::Review => "REVIEW",
            Decision::KeepControl => "KEEP CONTROL",
            Decision::InsufficientData => "INSUFFICIENT DATA",
        };
        f.write_str(label)
    }
}

/// Control vs. treatment deltas and the resulting recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub control_version: String,
    pub treatment_version: String,
    pub control_n: u64,
    pub treatment_n: u64,

    pub control_success_rate: f64,
    pub treatment_success_rate: f64,
    /// Percentage points, positive when treatment succeeds more often
    pub success_rate_delta: f64,
    /// Two-sided two-proportion z-test; `None` when the test is undefined
    pub success_rate_p_value: Option<f64>,

    pub control_avg_time_ms: f64,
    pub treatment_avg_time_ms: f64,
    /// Negative when treatment is faster
    pub time_delta_ms: f64,

    pub control_avg_cost_usd: f64,
    pub treatment_avg_cost_usd: f64,
    pub cost_delta_usd: f64,
    /// Percent of control cost; 0 when control cost is 0
    pub cost_delta_pct: f64,

    pub is_significant: bool,
    pub confidence_level: f64,
    pub significance_policy: SignificancePolicy,
    pub decision: Decision,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    config: ComparisonConfig,
}

impl ComparisonEngine {
    pub fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Compare two summaries. `confidence_level` defaults to the configured level.
    pub fn compare(
        &self,
        control: &PromptMetricsSummary,
        treatment: &PromptMetricsSummary,
        confidence_level: Option<f64>,
    ) -> Result<ComparisonResult> {
        let confidence_level = confidence_level.unwrap_or(self.config.default_confidence_level);
        validate_confidence_level(confidence_level)?;

        let success_rate_delta = treatment.success_rate - control.success_rate;
        let time_delta_ms = treatment.avg_processing_time_ms - control.avg_processing_time_ms;
        let cost_delta_usd = treatment.avg_cost_per_request - control.avg_cost_per_request;
        let cost_delta_pct = if control.avg_cost_per_request > 0.0 {
            cost_delta_usd / control.avg_cost_per_request * 100.0
        } else {
            0.0
        };

        let p_value = stats::two_proportion_p_value(
            control.successful_requests,
            control.total_requests,
            treatment.successful_requests,
            treatment.total_requests,
        );

        let enough_samples = control.total_requests >= self.config.min_sample_size && treatment.total_requests >= self.config.min_sample_size;
        let is_significant = match self.config.significance {
            SignificancePolicy::SampleSize => enough_samples,
            SignificancePolicy::SampleSizeAndZTest => enough_samples && p_value.is_some_and(|p| p < 1.0 - confidence_level),
        };

        let (decision, recommendation) = self.recommend(control, treatment, is_significant, success_rate_delta, cost_delta_pct);

        Ok(ComparisonResult {
            control_version: control.prompt_version.clone(),
            treatment_version: treatment.prompt_version.clone(),
            control_n: control.total_requests,
            treatment_n: treatment.total_requests,
            control_success_rate: control.success_rate,
            treatment_success_rate: treatment.success_rate,
            success_rate_delta,
            success_rate_p_value: p_value,
            control_avg_time_ms: control.avg_processing_time_ms,
            treatment_avg_time_ms: treatment.avg_processing_time_ms,
            time_delta_ms,
            control_avg_cost_usd: control.avg_cost_per_request,
            treatment_avg_cost_usd: treatment.avg_cost_per_request,
            cost_delta_usd,
            cost_delta_pct,
            is_significant,
            confidence_level,
            significance_policy: self.config.significance,
            decision,
            recommendation,
        })
    }

    /// First matching rule wins.
    fn recommend(
        &self,
        control: &PromptMetricsSummary,
        treatment: &PromptMetricsSummary,
        is_significant: bool,
        delta: f64,
        cost_delta_pct: f64,
    ) -> (Decision, String) {
        let cfg = &self.config;
        let treatment_version = &treatment.prompt_version;

        if !is_significant {
            let detail = if control.total_requests < cfg.min_sample_size || treatment.total_requests < cfg.min_sample_size {
                format!(
                    "need {} per version, have {} ({}) and {} ({})",
                    cfg.min_sample_size, control.total_requests, control.prompt_version, treatment.total_requests, treatment.prompt_version
                )
            } else {
                "success rate difference is not statistically significant".to_string()
            };
            return (
                Decision::InsufficientData,
                format!("{}: need more observations before deciding; {detail}", Decision::InsufficientData),
            );
        }

        if delta >= cfg.min_improvement_pp && cost_delta_pct <= cfg.max_cost_increase_pct {
            return (
                Decision::Promote,
                format!("{}: {treatment_version} shows {delta:.1}% better success rate", Decision::Promote),
            );
        }

        if delta <= -cfg.min_improvement_pp || delta < -cfg.max_regression_pp {
            return (
                Decision::KeepControl,
                format!("{}: {treatment_version} regresses success rate by {:.1}%", Decision::KeepControl, -delta),
            );
        }

        let reason = if delta >= cfg.min_improvement_pp {
            format!("{treatment_version} is {delta:.1}% better but {cost_delta_pct:.1}% more expensive")
        } else {
            format!(
                "inconclusive, delta {delta:.1}% below promotion threshold of {:.1}%",
                cfg.min_improvement_pp
            )
        };
        (Decision::Review, format!("{}: {reason}", Decision::Review))
    }
}
