//! HTTP status classification for the remote APIs.

use hunger_core::Error;

/// Remote error codes derived from the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorCode {
    /// Missing or rejected session credentials.
    Unauthorized,
    /// Rate limit exceeded.
    RateLimited,
    /// Unknown product, insight or logo.
    NotFound,
    /// Request rejected as malformed.
    BadRequest,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl RemoteErrorCode {
    /// Determine error code from an HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited,
            404 => Self::NotFound,
            400 | 422 => Self::BadRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate limited",
            Self::NotFound => "not found",
            Self::BadRequest => "bad request",
            Self::ServerError => "server error",
            Self::Unknown => "unexpected status",
        }
    }
}

/// Map a non-success search response to [`Error::FetchFailed`].
pub fn fetch_error(status: u16, body: &str) -> Error {
    let code = RemoteErrorCode::from_status(status);
    Error::FetchFailed(format!("{} ({}): {}", code.as_str(), status, truncate(body)))
}

/// Map a non-success annotation response to [`Error::SubmissionFailed`].
pub fn submission_error(status: u16, body: &str) -> Error {
    let code = RemoteErrorCode::from_status(status);
    Error::SubmissionFailed(format!("{} ({}): {}", code.as_str(), status, truncate(body)))
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
