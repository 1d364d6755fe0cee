//! Prompt-version analytics core.
//!
//! Everything in this module is synchronous and side-effect free: observations go in,
//! summaries and comparisons come out. Fetching observations (and therefore the time
//! window) is the caller's job, see [`crate::service::AnalyticsService`].
//!
//! - [`MetricsEngine`] turns one version's observations into a [`PromptMetricsSummary`]
//! - [`ComparisonEngine`] turns two summaries into a [`ComparisonResult`] with a [`Decision`]
//! - [`stats`] and [`pricing`] hold the shared helpers (nearest-rank percentile, cost table)

pub mod comparison;
pub mod errors;
pub mod observation;
pub mod pricing;
pub mod stats;
pub mod summary;

pub use comparison::{ComparisonConfig, ComparisonEngine, ComparisonResult, Decision, SignificancePolicy};
pub use errors::AnalyticsError;
pub use observation::{MedicalData, Observation, ObservationDraft, TOTAL_EXPECTED_FIELDS};
pub use pricing::{ModelPricing, PricingTable};
pub use summary::{MetricsEngine, PromptMetricsSummary, SummaryConfig};
