//! Error types for Helmsman
//!
//! This module defines all error types used throughout the orchestration
//! engine. Uses `thiserror` for ergonomic error handling with automatic
//! `Display` and `Error` trait implementations.

use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured provider error classification.
///
/// Provides fine-grained categorization of model service failures, enabling
/// retry decisions without string matching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// 401/403: Invalid API key or authentication failure
    #[error("Authentication error: {0}")]
    Auth(String),
    /// 429: Rate limit or quota exceeded
    #[error("Rate limit error: {0}")]
    RateLimit(String),
    /// 402: Payment required or billing issue
    #[error("Billing error: {0}")]
    Billing(String),
    /// 500/502/503/504: Server-side errors
    #[error("Server error: {0}")]
    ServerError(String),
    /// 400: Bad request, invalid JSON, malformed parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// 404: Model not found or endpoint not available
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    /// Connection or read timeout
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Connection refused, DNS failure, reset mid-request
    #[error("Network error: {0}")]
    Network(String),
    /// Provider-specific overload signal carried in a non-429 response
    #[error("Overloaded error: {0}")]
    Overloaded(String),
    /// Catch-all for unrecognized errors
    #[error("Unknown provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Returns `true` if the request should be retried with backoff.
    ///
    /// Only rate-limit signals and network-level failures are retried.
    /// Server errors are surfaced to the caller as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit(_)
                | ProviderError::Overloaded(_)
                | ProviderError::Timeout(_)
                | ProviderError::Network(_)
        )
    }

    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::Billing(_) => Some(402),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::ModelNotFound(_) => Some(404),
            ProviderError::Overloaded(_) => Some(503),
            ProviderError::Timeout(_) | ProviderError::Network(_) | ProviderError::Unknown(_) => {
                None
            }
        }
    }
}

/// Failure surfaced by the model adapter once its retry policy has run.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A retryable failure that outlived the retry budget.
    #[error("Model call failed after {attempts} attempts: {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: ProviderError,
    },
    /// A failure that retrying cannot fix.
    #[error("Model call failed: {0}")]
    Fatal(#[source] ProviderError),
}

impl ModelError {
    /// Whether the underlying cause was transient (rate limit, network).
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Transient { .. })
    }

    /// The classified provider error behind this failure.
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            ModelError::Transient { source, .. } => source,
            ModelError::Fatal(source) => source,
        }
    }
}

impl From<ProviderError> for HelmError {
    fn from(err: ProviderError) -> Self {
        HelmError::Provider(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Helmsman operations.
#[derive(Error, Debug)]
pub enum HelmError {
    /// Missing or invalid configuration (e.g. the store credential)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw provider failure, before the retry layer has classified it
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// Model adapter failure after retry policy
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Tool execution errors (invalid parameters, execution failures, etc.)
    #[error("Tool error: {0}")]
    Tool(String),

    /// The tool registry was invoked without the execution context a tool requires
    #[error("Tool context error: {0}")]
    ToolContext(String),

    /// Persistence store failures
    #[error("Store error: {0}")]
    Store(String),

    /// Resource not found (conversations, files, etc.)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The job was cancelled by a correlated cancel event
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Security violations (blocked hosts, path escapes)
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// Message bus channel closed unexpectedly
    #[error("Bus error: channel closed")]
    BusClosed,

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HelmError {
    /// Whether this error stems from cooperative cancellation rather than failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HelmError::Cancelled(_))
    }
}

/// A specialized `Result` type for Helmsman operations.
pub type Result<T> = std::result::Result<T, HelmError>;
