//! Observation ingestion handler

use axum::{extract::State, http::StatusCode, response::Json};
use tracing::debug;

use crate::{
    AppState,
    analytics::ObservationDraft,
    api::models::observations::{CreateObservation, ObservationResponse},
    errors::Error,
};

/// Record an extraction observation
///
/// Called by the extraction pipeline once per request. Missing `prompt_version`, `model_id`
/// and `timestamp` fall back to the configured defaults and the time of ingestion.
#[utoipa::path(
    post,
    path = "/observations",
    request_body = CreateObservation,
    responses(
        (status = 201, description = "Observation recorded", body = ObservationResponse),
        (status = 400, description = "Invalid observation"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "observations",
)]
#[tracing::instrument(skip_all)]
pub async fn create_observation(
    State(state): State<AppState>,
    Json(body): Json<CreateObservation>,
) -> Result<(StatusCode, Json<ObservationResponse>), Error> {
    let draft = ObservationDraft::try_from(body)?;
    let observation = state.service.record(draft).await?;

    if let Some(metrics) = &state.metrics {
        metrics.record_observation(&observation);
    }
    debug!(id = %observation.id, "Observation accepted");

    Ok((StatusCode::CREATED, Json(observation.into())))
}

#[cfg(test)]
mod tests {
    use crate::api::models::observations::ObservationResponse;
    use crate::test_utils::*;
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_create_observation_with_defaults() {
        let (server, store) = create_test_app();

        let response = server
            .post("/api/v1/observations")
            .json(&json!({
                "success": true,
                "processing_time_ms": 850,
                "input_tokens": 1200,
                "output_tokens": 300,
                "medical_data": {
                    "patient_name": "John Smith",
                    "date_of_birth": "1960-04-12",
                    "diagnoses": ["hypertension"],
                    "medications": ["lisinopril"]
                }
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let observation: ObservationResponse = response.json();
        assert_eq!(observation.prompt_version, "v2.0.0");
        assert_eq!(observation.fields_extracted, 4);
        assert_eq!(store.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_create_observation_rejects_negative_values() {
        let (server, store) = create_test_app();

        let response = server
            .post("/api/v1/observations")
            .json(&json!({"prompt_version": "v1.0.0", "success": true, "input_tokens": -5}))
            .await;
        response.assert_status_bad_request();
        assert!(response.text().contains("input_tokens"));

        let response = server
            .post("/api/v1/observations")
            .json(&json!({"prompt_version": "v1.0.0", "success": false, "processing_time_ms": -1}))
            .await;
        response.assert_status_bad_request();
        assert!(store.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_create_observation_rejects_unpriced_model() {
        let (server, store) = create_test_app();

        let response = server
            .post("/api/v1/observations")
            .json(&json!({"success": true, "model_id": "gpt-unknown"}))
            .await;
        response.assert_status_bad_request();
        assert!(store.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_recorded_observations_feed_summary() {
        let (server, _store) = create_test_app();

        for success in [true, true, false] {
            let fields_extracted = if success { 9 } else { 0 };
            server
                .post("/api/v1/observations")
                .json(&json!({
                    "prompt_version": "v3.0.0",
                    "success": success,
                    "processing_time_ms": 1000,
                    "input_tokens": 1000,
                    "output_tokens": 1000,
                    "fields_extracted": fields_extracted
                }))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let response = server.get("/api/v1/metrics/prompts/v3.0.0").await;
        response.assert_status_ok();
        let summary: serde_json::Value = response.json();
        assert_eq!(summary["total_requests"], 3);
        assert_eq!(summary["avg_field_completeness"], 100.0);
    }
}
