//! Error types for the annotation work queue.

use thiserror::Error;

/// Result type alias using the work queue's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fetch, submission and configuration failures.
///
/// None of these are fatal to a session: a failed fetch leaves the buffer
/// where it was and a failed submission is only reported on the event bus.
#[derive(Error, Debug)]
pub enum Error {
    /// Page fetch failed (transport, HTTP status, or response parsing)
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// Annotation submission failed
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error came from the page fetch path.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Error::FetchFailed(_) | Error::Request(_) | Error::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
