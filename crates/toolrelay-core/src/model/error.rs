//! Model service error types

use thiserror::Error;

/// Errors that can occur while talking to the model service
#[derive(Error, Debug)]
pub enum ModelError {
    /// Missing API key
    #[error("API key is required for {service}")]
    MissingApiKey { service: String },

    /// The service rejected or failed the request
    #[error("{service} API error: {message}")]
    Api { service: String, message: String },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid response from the service
    #[error("Invalid response from {service}: {message}")]
    InvalidResponse { service: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    /// Create an API error
    pub fn api(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(service: impl Into<String>) -> Self {
        Self::MissingApiKey {
            service: service.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            message: message.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
