use thiserror::Error;

/// Errors raised by the analytics core.
///
/// None of these are retryable: the engines are pure, so the same input always
/// produces the same error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// No observations exist for the version in the requested window
    #[error("No data found for prompt version: {version}")]
    NotFound { version: String },

    /// One or both arms of a comparison have no observations
    #[error("Insufficient data for comparison: no observations for prompt version {version}")]
    InsufficientData { version: String },

    /// A cost computation hit a model with no configured rate
    #[error("No pricing configured for model '{model}'")]
    UnknownModel { model: String },

    /// An observation tagged with a different version reached a single-version summary
    #[error("Observation for prompt version '{found}' passed to summary of '{expected}'")]
    VersionMismatch { expected: String, found: String },

    /// Malformed input (negative counts, out-of-range parameters, ...)
    #[error("{message}")]
    Validation { message: String },
}

impl AnalyticsError {
    pub fn validation(message: impl Into<String>) -> Self {
        AnalyticsError::Validation { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
