//! Error type for the broker adapter.

use thiserror::Error;

/// Errors raised by [`crate::client::BrokerClient`] and [`crate::ledger`].
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The initial connection attempt failed. Callers treat this as fatal.
    #[error("failed to connect to broker: {0}")]
    Connection(String),

    /// A command against an already-open connection failed.
    #[error("broker command failed: {0}")]
    Command(String),

    /// A stored value could not be decoded as the type the caller expected.
    #[error("malformed value at key `{key}`: {reason}")]
    Malformed {
        /// The broker key whose value failed to decode.
        key: String,
        /// Why decoding failed.
        reason: String,
    },
}

/// Convenience alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
