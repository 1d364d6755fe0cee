//! HTTP request handlers.
//!
//! Handlers deserialize the request, call [`crate::service::AnalyticsService`] and convert the
//! result into an API model. Errors are returned as [`crate::errors::Error`], which maps to a
//! status code and a user-safe message.
//!
//! - [`metrics`]: Prompt summaries and version comparisons
//! - [`observations`]: Observation ingestion
//! - [`prompts`]: Known prompt versions

pub mod metrics;
pub mod observations;
pub mod prompts;
