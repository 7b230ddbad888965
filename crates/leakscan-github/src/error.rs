//! Error types for the search provider.

use thiserror::Error;

/// Errors that can occur while talking to the code search API.
#[derive(Error, Debug)]
pub enum GithubError {
    /// No access token configured; searching is disabled
    #[error("no GitHub access token configured")]
    MissingToken,

    /// HTTP client could not be constructed
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// Abuse or primary rate limit hit
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        /// Error message from the API
        message: String,
    },

    /// Token rejected
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message from the API
        message: String,
    },

    /// API error with status code
    #[error("API error: status {status}, {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body is not a search result page
    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GithubError {
    /// Build the error for a non-success response.
    ///
    /// GitHub reports both primary and secondary (abuse) rate limits as 403
    /// with an explanatory body, and sometimes as 429.
    #[must_use]
    pub fn from_status(status: u16, rate_limit_exhausted: bool, message: String) -> Self {
        let mentions_rate_limit = message.to_ascii_lowercase().contains("rate limit");
        match status {
            429 => Self::RateLimited { message },
            403 if rate_limit_exhausted || mentions_rate_limit => Self::RateLimited { message },
            401 => Self::AuthenticationFailed { message },
            _ => Self::Api { status, message },
        }
    }

    /// Short machine-friendly label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::Client(_) => "client",
            Self::RateLimited { .. } => "rate_limited",
            Self::AuthenticationFailed { .. } => "authentication",
            Self::Api { .. } => "api",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
        }
    }
}

/// Result type alias for search provider operations.
pub type Result<T> = std::result::Result<T, GithubError>;
