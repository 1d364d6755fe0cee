//! Per-request observations recorded by the extraction pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{AnalyticsError, Result};

/// Number of fields in the extraction schema (see [`MedicalData`]).
pub const TOTAL_EXPECTED_FIELDS: u32 = 9;

/// One recorded outcome of an extraction request.
///
/// Created once after the inference call resolves and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub prompt_version: String,
    /// Model used for the call; `None` means the configured default model
    pub model_id: Option<String>,
    pub success: bool,
    /// Absent when the request failed before timing was captured
    pub processing_time_ms: Option<u64>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub fields_extracted: u32,
    pub timestamp: DateTime<Utc>,
}

/// An observation as it arrives from outside the core (HTTP body, database row).
///
/// Numeric fields are signed so that negative values can be rejected with a
/// validation error instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationDraft {
    pub prompt_version: Option<String>,
    pub model_id: Option<String>,
    pub success: bool,
    pub processing_time_ms: Option<i64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub fields_extracted: Option<i64>,
    pub medical_data: Option<MedicalData>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ObservationDraft {
    /// Validate and fill defaults.
    ///
    /// `fields_extracted` falls back to the populated-field count of `medical_data`,
    /// then to zero.
    pub fn into_observation(self, default_version: &str, now: DateTime<Utc>) -> Result<Observation> {
        let prompt_version = match self.prompt_version {
            Some(v) if v.trim().is_empty() => return Err(AnalyticsError::validation("prompt_version must not be empty")),
            Some(v) => v,
            None => default_version.to_string(),
        };

        let processing_time_ms = self
            .processing_time_ms
            .map(|ms| non_negative("processing_time_ms", ms))
            .transpose()?;
        let input_tokens = non_negative("input_tokens", self.input_tokens.unwrap_or(0))?;
        let output_tokens = non_negative("output_tokens", self.output_tokens.unwrap_or(0))?;

        let fields_extracted = match (self.fields_extracted, &self.medical_data) {
            (Some(n), _) => u32::try_from(non_negative("fields_extracted", n)?)
                .map_err(|_| AnalyticsError::validation(format!("fields_extracted out of range: {n}")))?,
            (None, Some(data)) => data.populated_fields(),
            (None, None) => 0,
        };

        Ok(Observation {
            id: Uuid::new_v4(),
            prompt_version,
            model_id: self.model_id,
            success: self.success,
            processing_time_ms,
            input_tokens,
            output_tokens,
            fields_extracted,
            timestamp: self.timestamp.unwrap_or(now),
        })
    }
}

fn non_negative(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| AnalyticsError::validation(format!("{field} must be non-negative, got {value}")))
}

/// The structured record a successful extraction produces.
///
/// Only used to count populated fields; contents are opaque here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalData {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub diagnoses: Vec<Value>,
    #[serde(default)]
    pub medications: Vec<Value>,
    #[serde(default)]
    pub lab_values: Vec<Value>,
    #[serde(default)]
    pub procedures: Vec<Value>,
    #[serde(default)]
    pub allergies: Vec<Value>,
    #[serde(default)]
    pub vital_signs: Vec<Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MedicalData {
    /// Count of non-empty schema fields, at most [`TOTAL_EXPECTED_FIELDS`].
    pub fn populated_fields(&self) -> u32 {
        let text = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        let lists = [
            &self.diagnoses,
            &self.medications,
            &self.lab_values,
            &self.procedures,
            &self.allergies,
            &self.vital_signs,
        ];

        let scalars = [text(&self.patient_name), text(&self.date_of_birth), text(&self.notes)];
        (scalars.iter().filter(|&&b| b).count() + lists.iter().filter(|l| !l.is_empty()).count()) as u32
    }
}
