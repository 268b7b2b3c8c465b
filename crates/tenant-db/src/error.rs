//! Error type for the tenant database adapter.

use thiserror::Error;

/// Errors raised by the tenant DB adapter.
///
/// Per §4.2, callers never see raw `sqlx` errors propagate as panics: every
/// repository method logs and returns `0`/`None`/`Vec::new()` on failure
/// rather than raising, except [`TenantDbError::SchemaMismatch`], which is
/// fatal at startup.
#[derive(Debug, Error)]
pub enum TenantDbError {
    /// A query failed against an open connection.
    #[error("database query failed: {0}")]
    Query(String),

    /// `checkCompatibility` found the live schema did not match the
    /// expected column list. Fatal — the caller should abort startup.
    #[error("table `{table}` has changed, expected columns {expected:?}, found {actual:?}")]
    SchemaMismatch {
        /// The table that failed the check.
        table: &'static str,
        /// The column list this adapter was built against.
        expected: Vec<&'static str>,
        /// The column list actually present in the database.
        actual: Vec<String>,
    },
}

/// Convenience alias for tenant DB operations.
pub type Result<T> = std::result::Result<T, TenantDbError>;
