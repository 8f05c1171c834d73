use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Any other rejection (400, 422, ...). Carries only the server's
    /// reason, which the UI renders verbatim.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Standard error envelope: FastAPI-style `detail` or a generic `message`
#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            // Back off to a char boundary; bodies are server-controlled and
            // may hold multi-byte UTF-8 right at the cut
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    /// Pull the human-readable reason out of an error body, falling back to
    /// the (truncated) raw body when it is not the standard envelope.
    fn extract_reason(body: &str) -> String {
        serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.detail.or(e.message))
            .unwrap_or_else(|| Self::truncate_body(body))
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let reason = Self::extract_reason(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(reason),
            403 => ApiError::AccessDenied(reason),
            404 => ApiError::NotFound(reason),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(reason),
            _ => {
                debug!(status = %status, "Request rejected");
                ApiError::Rejected(reason)
            }
        }
    }

    /// The server-supplied message, without the variant prefix, suitable for
    /// verbatim display to the user.
    pub fn server_message(&self) -> String {
        match self {
            ApiError::AccessDenied(m)
            | ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::ServerError(m)
            | ApiError::InvalidResponse(m)
            | ApiError::Rejected(m) => m.clone(),
            ApiError::RateLimited | ApiError::NetworkError(_) => self.to_string(),
        }
    }
}
