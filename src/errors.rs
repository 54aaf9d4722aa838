/*!
 * Error types for the subtrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RequestFailed(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The backend failed its availability probe before any work started
    #[error("Translation backend is unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend answered a batch with the wrong number of items
    #[error("Batch size mismatch: expected {expected} items, got {actual}")]
    BatchSizeMismatch {
        /// Number of items sent
        expected: usize,
        /// Number of items received
        actual: usize,
    },

    /// The backend answered a batch but left some items blank
    #[error("Batch response is missing items {0:?}")]
    MissingItems(Vec<usize>),

    /// The backend answered with nothing usable
    #[error("Empty response from backend")]
    EmptyResponse,

    /// The backend could not be built from configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
