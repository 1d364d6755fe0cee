//! Summary and comparison API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::analytics::{ComparisonResult, Decision, PromptMetricsSummary, SignificancePolicy};

/// Query parameters for a prompt summary
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct SummaryQuery {
    /// Look-back window in days (default: 7, max: 90)
    pub days: Option<u32>,
}

/// Aggregated metrics for one prompt version
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromptMetricsResponse {
    pub prompt_version: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percent, 0-100
    pub success_rate: f64,

    pub avg_processing_time_ms: f64,
    pub p50_processing_time_ms: u64,
    pub p95_processing_time_ms: u64,
    pub p99_processing_time_ms: u64,

    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// USD, unrounded
    pub total_cost_usd: f64,
    pub avg_cost_per_request: f64,

    /// Percent of schema fields populated, over successful requests
    pub avg_field_completeness: f64,
    pub avg_fields_extracted: f64,

    pub first_request: DateTime<Utc>,
    pub last_request: DateTime<Utc>,
}

impl From<PromptMetricsSummary> for PromptMetricsResponse {
    fn from(s: PromptMetricsSummary) -> Self {
        Self {
            prompt_version: s.prompt_version,
            total_requests: s.total_requests,
            successful_requests: s.successful_requests,
            failed_requests: s.failed_requests,
            success_rate: s.success_rate,
            avg_processing_time_ms: s.avg_processing_time_ms,
            p50_processing_time_ms: s.p50_processing_time_ms,
            p95_processing_time_ms: s.p95_processing_time_ms,
            p99_processing_time_ms: s.p99_processing_time_ms,
            total_input_tokens: s.total_input_tokens,
            total_output_tokens: s.total_output_tokens,
            total_cost_usd: s.total_cost_usd,
            avg_cost_per_request: s.avg_cost_per_request,
            avg_field_completeness: s.avg_field_completeness,
            avg_fields_extracted: s.avg_fields_extracted,
            first_request: s.first_request,
            last_request: s.last_request,
        }
    }
}

/// Request body for comparing two prompt versions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompareRequest {
    pub control_version: String,
    pub treatment_version: String,
    /// Between 0.5 and 0.99 (default: 0.95)
    pub confidence_level: Option<f64>,
    /// Look-back window in days (default: 7, max: 90)
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionResponse {
    Promote,
    Review,
    KeepControl,
    InsufficientData,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Promote => DecisionResponse::Promote,
            Decision::Review => DecisionResponse::Review,
            Decision::KeepControl => DecisionResponse::KeepControl,
            Decision::InsufficientData => DecisionResponse::InsufficientData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignificancePolicyResponse {
    SampleSize,
    SampleSizeAndZTest,
}

impl From<SignificancePolicy> for SignificancePolicyResponse {
    fn from(policy: SignificancePolicy) -> Self {
        match policy {
            SignificancePolicy::SampleSize => SignificancePolicyResponse::SampleSize,
            SignificancePolicy::SampleSizeAndZTest => SignificancePolicyResponse::SampleSizeAndZTest,
        }
    }
}

/// Control vs. treatment comparison with a recommendation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComparisonResponse {
    pub control_version: String,
    pub treatment_version: String,
    pub control_n: u64,
    pub treatment_n: u64,

    pub control_success_rate: f64,
    pub treatment_success_rate: f64,
    /// Percentage points, positive when treatment is better
    pub success_rate_delta: f64,
    /// Two-sided two-proportion z-test; null when undefined
    pub success_rate_p_value: Option<f64>,

    pub control_avg_time_ms: f64,
    pub treatment_avg_time_ms: f64,
    pub time_delta_ms: f64,

    pub control_avg_cost_usd: f64,
    pub treatment_avg_cost_usd: f64,
    pub cost_delta_usd: f64,
    pub cost_delta_pct: f64,

    pub is_significant: bool,
    pub confidence_level: f64,
    pub significance_policy: SignificancePolicyResponse,
    pub decision: DecisionResponse,
    pub recommendation: String,
}

impl From<ComparisonResult> for ComparisonResponse {
    fn from(r: ComparisonResult) -> Self {
        Self {
            control_version: r.control_version,
            treatment_version: r.treatment_version,
            control_n: r.control_n,
            treatment_n: r.treatment_n,
            control_success_rate: r.control_success_rate,
            treatment_success_rate: r.treatment_success_rate,
            success_rate_delta: r.success_rate_delta,
            success_rate_p_value: r.success_rate_p_value,
            control_avg_time_ms: r.control_avg_time_ms,
            treatment_avg_time_ms: r.treatment_avg_time_ms,
            time_delta_ms: r.time_delta_ms,
            control_avg_cost_usd: r.control_avg_cost_usd,
            treatment_avg_cost_usd: r.treatment_avg_cost_usd,
            cost_delta_usd: r.cost_delta_usd,
            cost_delta_pct: r.cost_delta_pct,
            is_significant: r.is_significant,
            confidence_level: r.confidence_level,
            significance_policy: r.significance_policy.into(),
            decision: r.decision.into(),
            recommendation: r.recommendation,
        }
    }
}
