//! API request and response data models.
//!
//! These mirror the analytics types with OpenAPI schemas attached; conversions live next to
//! each model.

pub mod metrics;
pub mod observations;
pub mod prompts;
