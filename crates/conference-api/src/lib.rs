//! Adapter for a single external conference server's HTTP API (§4.3).
//!
//! This crate knows nothing about meetings, servers, or schedules as
//! domain concepts — it only knows how to sign a query string, send it,
//! and parse the XML envelope that comes back. Orchestration lives above
//! this crate.

#![warn(clippy::pedantic)]

pub mod checksum;
pub mod client;
pub mod error;
pub mod xml;

pub use client::{ConferenceApiClient, CreateMeetingParams, JoinRole, StartOutcome};
pub use error::{ConferenceApiError, Result};
