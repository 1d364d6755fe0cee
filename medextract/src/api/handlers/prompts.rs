//! Prompt version listing

use axum::{extract::State, response::Json};

use crate::{AppState, api::models::prompts::PromptVersionsResponse, errors::Error};

/// List prompt versions with recorded observations
#[utoipa::path(
    get,
    path = "/prompts/versions",
    responses(
        (status = 200, description = "Known prompt versions", body = PromptVersionsResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "prompts",
)]
#[tracing::instrument(skip_all)]
pub async fn list_prompt_versions(State(state): State<AppState>) -> Result<Json<PromptVersionsResponse>, Error> {
    let versions = state.service.versions().await?;
    Ok(Json(PromptVersionsResponse {
        versions,
        default_version: state.service.default_version().to_string(),
    }))
}
