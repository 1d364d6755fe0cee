use crate::analytics::AnalyticsError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Error raised by the metrics or comparison engines
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Observation store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Analytics(err) => match err {
                AnalyticsError::NotFound { .. } => StatusCode::NOT_FOUND,
                AnalyticsError::InsufficientData { .. } | AnalyticsError::Validation { .. } => StatusCode::BAD_REQUEST,
                AnalyticsError::UnknownModel { .. } | AnalyticsError::VersionMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Internal { .. } | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::Analytics(err) => match err {
                AnalyticsError::NotFound { .. } | AnalyticsError::InsufficientData { .. } | AnalyticsError::Validation { .. } => {
                    err.to_string()
                }
                // A priced model list or a mis-tagged observation is a server configuration problem
                AnalyticsError::UnknownModel { .. } | AnalyticsError::VersionMismatch { .. } => "Internal server error".to_string(),
            },
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Store(_) => "Database error occurred".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match self.status_code() {
            status if status.is_server_error() => {
                tracing::error!("Internal service error: {:#}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
