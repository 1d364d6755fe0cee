//! Prompt summary and comparison handlers

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use crate::{
    AppState,
    api::models::metrics::{CompareRequest, ComparisonResponse, PromptMetricsResponse, SummaryQuery},
    errors::Error,
};

/// Get aggregated metrics for a prompt version
///
/// Summarizes every observation recorded for the version within the last `days` days.
#[utoipa::path(
    get,
    path = "/metrics/prompts/{version}",
    params(
        ("version" = String, Path, description = "Prompt version, e.g. v2.0.0"),
        SummaryQuery,
    ),
    responses(
        (status = 200, description = "Metrics summary", body = PromptMetricsResponse),
        (status = 400, description = "Invalid window"),
        (status = 404, description = "No observations for this version in the window"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "metrics",
)]
#[tracing::instrument(skip_all, fields(version = %version))]
pub async fn get_prompt_metrics(
    Path(version): Path<String>,
    Query(query): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<PromptMetricsResponse>, Error> {
    let summary = state.service.prompt_summary(&version, query.days).await?;
    Ok(Json(summary.into()))
}

/// Compare two prompt versions
///
/// Returns success, latency and cost deltas of the treatment against the control, and a
/// recommendation of PROMOTE, REVIEW, KEEP CONTROL or INSUFFICIENT DATA.
#[utoipa::path(
    post,
    path = "/metrics/compare",
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Comparison result", body = ComparisonResponse),
        (status = 400, description = "A version has no observations, or the parameters are out of range"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "metrics",
)]
#[tracing::instrument(skip_all, fields(control = %body.control_version, treatment = %body.treatment_version))]
pub async fn compare_prompt_versions(State(state): State<AppState>, Json(body): Json<CompareRequest>) -> Result<Json<ComparisonResponse>, Error> {
    if body.control_version == body.treatment_version {
        return Err(Error::BadRequest {
            message: "control_version and treatment_version must differ".to_string(),
        });
    }

    let result = state
        .service
        .compare(&body.control_version, &body.treatment_version, body.confidence_level, body.days)
        .await?;

    if let Some(metrics) = &state.metrics {
        metrics.record_comparison(&result);
    }

    Ok(Json(result.into()))
}
