//! HTTP admin surface library target.
//!
//! Exists so crate-level `tests/` integration suites can build the router
//! against a real (or live-gated) broker connection; `src/main.rs` declares
//! the same modules again for the binary, mirroring `ac-service`'s split.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod query;
pub mod routes;
