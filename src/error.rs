//! Unified error types for the server, client and tooling.
//!
//! Handler-facing errors live in [`crate::api::ApiError`]; this module holds
//! the errors raised while starting the process and by the API client.

use thiserror::Error;

/// Unified error type for process startup and tooling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics exporter could not be installed.
    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// API client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Server answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
    },

    /// Request could not be built or sent.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(reqwest::Error),

    /// Request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// Bearer token is not a valid header value.
    #[error("invalid authorization header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl ClientError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status } => Some(*status),
            ClientError::Http(e) | ClientError::Decode(e) => e.status().map(|s| s.as_u16()),
            ClientError::Encode(_) | ClientError::InvalidHeader(_) => None,
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
