//! Error type for the conference-API adapter.

use thiserror::Error;

/// Errors raised talking to the external conferencing server.
#[derive(Debug, Error)]
pub enum ConferenceApiError {
    /// The HTTP request itself failed (network, TLS, timeout).
    #[error("request to conference server failed: {0}")]
    Request(String),

    /// The server responded but the body could not be parsed as the BBB
    /// XML envelope.
    #[error("malformed response from conference server: {0}")]
    MalformedResponse(String),
}

/// Convenience alias for conference-API operations.
pub type Result<T> = std::result::Result<T, ConferenceApiError>;
