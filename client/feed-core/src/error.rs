/// Error types for the feed consistency layer
use resilience::RequestError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Sign-in required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server error ({status})")]
    ServerError { status: u16 },

    #[error("Unexpected response ({status})")]
    Http { status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FeedError {
    /// One-line notification shown to the user
    pub fn user_message(&self) -> String {
        match self {
            FeedError::Unauthenticated => "Please sign in to continue.".to_string(),
            FeedError::Forbidden(_) => {
                "You don't have permission to do that.".to_string()
            }
            FeedError::NotFound(_) => {
                "That content is no longer available. Refresh and try again.".to_string()
            }
            FeedError::Conflict(_) => {
                "That was already done. Please wait a moment and try again.".to_string()
            }
            FeedError::Validation(reason) => format!("Please check your input: {}.", reason),
            FeedError::RateLimited => {
                "Too many requests. Please try again shortly.".to_string()
            }
            FeedError::Network(_) => {
                "Network connection failed. Check your internet connection.".to_string()
            }
            FeedError::Timeout(_) => {
                "The request timed out. Check your connection and try again.".to_string()
            }
            FeedError::ServerError { status } => format!(
                "Something went wrong on our side ({}). Please try again later.",
                status
            ),
            FeedError::Http { status } => {
                format!("The request could not be completed ({}).", status)
            }
            FeedError::InvalidResponse(_) => {
                "Received an unexpected response. Please refresh the page.".to_string()
            }
        }
    }

    /// Whether the same user action may succeed later without any change
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::Network(_)
                | FeedError::Timeout(_)
                | FeedError::ServerError { .. }
                | FeedError::RateLimited
        )
    }
}

/// Map a classified transport failure onto the feed taxonomy
impl From<RequestError> for FeedError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Timeout(duration) => FeedError::Timeout(duration),
            RequestError::Network(msg) => FeedError::Network(msg),
            RequestError::Malformed(msg) => FeedError::InvalidResponse(msg),
            RequestError::Http { status, message } => {
                let detail = message.unwrap_or_else(|| format!("HTTP {}", status));
                match status {
                    400 | 413 | 415 | 422 => FeedError::Validation(detail),
                    401 => FeedError::Unauthenticated,
                    403 => FeedError::Forbidden(detail),
                    404 | 410 => FeedError::NotFound(detail),
                    409 => FeedError::Conflict(detail),
                    429 => FeedError::RateLimited,
                    500..=599 => FeedError::ServerError { status },
                    _ => FeedError::Http { status },
                }
            }
        }
    }
}

/// Result type alias for feed operations
pub type FeedResult<T> = Result<T, FeedError>;
