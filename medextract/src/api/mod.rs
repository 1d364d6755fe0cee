//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Metrics** (`/api/v1/metrics/*`): Per-version summaries and version comparisons
//! - **Observations** (`/api/v1/observations`): Ingestion from the extraction pipeline
//! - **Prompts** (`/api/v1/prompts/*`): Known prompt versions
//!
//! All endpoints are documented with `utoipa`; the reference UI is served at `/docs`.

pub mod handlers;
pub mod models;
