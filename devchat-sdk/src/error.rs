use thiserror::Error;

/// Errors surfaced by the completion service boundary.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport-level failure (connection refused, timeout, bad body).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("completion API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered 200 but the choice list was empty.
    #[error("completion response contained no choices")]
    EmptyResponse,

    /// The retry budget was exhausted without a successful response.
    #[error("completion failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl CompletionError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Retries cover transport failures, rate limiting, and server-side
    /// errors. Client-side API errors (bad key, malformed request) fail
    /// immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Network(_) => true,
            CompletionError::Api { status, .. } => *status == 429 || *status >= 500,
            CompletionError::EmptyResponse => false,
            CompletionError::RetriesExhausted { .. } => false,
        }
    }
}
