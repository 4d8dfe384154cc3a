use thiserror::Error;

/// Message surfaced when a loader is pointed at an empty URL.
pub const INVALID_URL_MESSAGE: &str = "Invalid API URL";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid API URL")]
    InvalidInput,

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Failed to fetch data (status {status})")]
    FetchFailed { status: reqwest::StatusCode },

    #[error("Failed to parse response: {0}")]
    ParseFailure(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiError::FetchFailed { status } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::AuthFailure(_))
    }
}
