//! Error types for the BigQuery client.

use thiserror::Error;

/// Result type for BigQuery client operations.
pub type Result<T> = std::result::Result<T, BigQueryError>;

/// BigQuery client errors.
#[derive(Debug, Error)]
pub enum BigQueryError {
    /// Credentials could not be read or parsed
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Token exchange with the OAuth endpoint failed
    #[error("Auth error: {0}")]
    Auth(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the REST API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A job reached DONE with an error result
    #[error("Job {job_id} failed ({reason}): {message}")]
    JobFailed {
        job_id: String,
        reason: String,
        message: String,
    },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BigQueryError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            BigQueryError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
