//! Observation ingestion API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    analytics::{MedicalData, Observation, ObservationDraft},
    errors::Error,
};

/// One extraction outcome reported by the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateObservation {
    /// Defaults to the configured prompt version
    pub prompt_version: Option<String>,
    /// Defaults to the configured model
    pub model_id: Option<String>,
    pub success: bool,
    pub processing_time_ms: Option<i64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    /// Overrides the count derived from `medical_data`
    pub fields_extracted: Option<i64>,
    /// Extracted record; only its populated fields are counted
    #[schema(value_type = Option<Object>)]
    pub medical_data: Option<serde_json::Value>,
    /// Defaults to the time of ingestion
    pub timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<CreateObservation> for ObservationDraft {
    type Error = Error;

    fn try_from(body: CreateObservation) -> Result<Self, Self::Error> {
        let medical_data = body
            .medical_data
            .map(serde_json::from_value::<MedicalData>)
            .transpose()
            .map_err(|e| Error::BadRequest {
                message: format!("Invalid medical_data: {e}"),
            })?;

        Ok(ObservationDraft {
            prompt_version: body.prompt_version,
            model_id: body.model_id,
            success: body.success,
            processing_time_ms: body.processing_time_ms,
            input_tokens: body.input_tokens,
            output_tokens: body.output_tokens,
            fields_extracted: body.fields_extracted,
            medical_data,
            timestamp: body.timestamp,
        })
    }
}

/// A recorded observation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ObservationResponse {
    pub id: Uuid,
    pub prompt_version: String,
    pub model_id: Option<String>,
    pub success: bool,
    pub processing_time_ms: Option<u64>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub fields_extracted: u32,
    pub timestamp: DateTime<Utc>,
}

impl From<Observation> for ObservationResponse {
    fn from(o: Observation) -> Self {
        Self {
            id: o.id,
            prompt_version: o.prompt_version,
            model_id: o.model_id,
            success: o.success,
            processing_time_ms: o.processing_time_ms,
            input_tokens: o.input_tokens,
            output_tokens: o.output_tokens,
            fields_extracted: o.fields_extracted,
            timestamp: o.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_medical_data_is_parsed() {
        let body = CreateObservation {
            success: true,
            medical_data: Some(json!({
                "patient_name": "Jane Doe",
                "diagnoses": [{"condition": "Type 2 diabetes"}],
                "medications": [],
            })),
            ..Default::default()
        };
        let draft = ObservationDraft::try_from(body).unwrap();
        assert_eq!(draft.medical_data.map(|d| d.populated_fields()), Some(2));
    }

    #[test]
    fn test_malformed_medical_data_is_bad_request() {
        let body = CreateObservation {
            medical_data: Some(json!({"diagnoses": "not a list"})),
            ..Default::default()
        };
        assert!(matches!(ObservationDraft::try_from(body), Err(Error::BadRequest { .. })));
    }
}
