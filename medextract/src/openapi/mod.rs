//! OpenAPI documentation for the `/api/v1/*` endpoints.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "medextract analytics API",
        description = "Prompt-version metrics and comparisons for the medical extraction pipeline"
    ),
    servers(
        (url = "/api/v1", description = "Analytics API server")
    ),
    paths(
        api::handlers::metrics::get_prompt_metrics,
        api::handlers::metrics::compare_prompt_versions,
        api::handlers::observations::create_observation,
        api::handlers::prompts::list_prompt_versions,
    ),
    components(
        schemas(
            api::models::metrics::PromptMetricsResponse,
            api::models::metrics::CompareRequest,
            api::models::metrics::ComparisonResponse,
            api::models::metrics::DecisionResponse,
            api::models::metrics::SignificancePolicyResponse,
            api::models::observations::CreateObservation,
            api::models::observations::ObservationResponse,
            api::models::prompts::PromptVersionsResponse,
        )
    ),
    tags(
        (name = "metrics", description = "Prompt version summaries and comparisons"),
        (name = "observations", description = "Observation ingestion"),
        (name = "prompts", description = "Prompt versions"),
    )
)]
pub struct ApiDoc;
