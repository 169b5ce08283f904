//! Crate-wide error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure talking to the telemetry backend.
    #[error("backend request failed: {0}")]
    Backend(#[from] reqwest::Error),

    /// Backend answered, but not with a success status.
    #[error("backend returned {status} for {endpoint}")]
    BackendStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
