//! Error type for the orchestration engine's own operations.
//!
//! A tick never propagates a failure out past one meeting: every call site
//! in [`crate::tick`] logs and moves on (§5, "a malformed meeting/server
//! record skips that meeting, not the whole pass"). This type exists for the
//! handful of helpers that need a `Result` to use `?` internally.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("broker error: {0}")]
    Broker(#[from] broker::BrokerError),
    #[error("tenant database error: {0}")]
    TenantDb(#[from] tenant_db::TenantDbError),
    #[error("malformed record: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
