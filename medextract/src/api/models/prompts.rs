use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Prompt versions that have recorded observations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromptVersionsResponse {
    /// Newest version first
    pub versions: Vec<String>,
    /// Version applied to observations that arrive without one
    pub default_version: String,
}
