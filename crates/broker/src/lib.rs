//! Broker adapter: the process-wide Redis connection every component shares
//! (keyed records, membership sets, consumer-group streams, status ledger).

#![warn(clippy::pedantic)]

/// Raw broker operations: records, sets, streams, hashes, key lifecycle.
pub mod client;

/// Error type for broker operations.
pub mod error;

/// The idempotent status ledger built on top of the broker's hash primitives.
pub mod ledger;

pub use client::{BrokerClient, StreamMessage};
pub use error::{BrokerError, Result};
pub use ledger::{EntityKind, StatusLedger, StatusRecord};
