//! Small helpers shared by every repository: random secret generation and
//! the generic by-column lookups the original exposed as `getTableField`,
//! `updateField`, `tableRowAsDict`, and `tableRowsAsDict`.

use crate::error::{Result, TenantDbError};
use rand::Rng;
use sqlx::PgPool;

const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate an `n`-character alphanumeric secret, matching the original's
/// `random_secret(stringLength=11)` (used for generated uids, passwords,
/// and room aliases).
#[must_use]
pub fn random_secret(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let idx = rng.gen_range(0..ALNUM.len());
            *ALNUM.get(idx).unwrap_or(&b'0') as char
        })
        .collect()
}

/// Generate a 32-character hex id, matching `uuid.uuid4().hex` (used for
/// `bbb_id` when the caller does not supply one).
#[must_use]
pub fn random_hex_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A table this adapter is allowed to address generically. Kept as a closed
/// enum rather than accepting an arbitrary `&str` for the table/column name,
/// since those are interpolated directly into SQL (there is no bind
/// placeholder for identifiers) — this is the Rust equivalent of the
/// original's `"{}"` string-formatted table/field names, made injection-safe
/// by allow-listing instead of accepting caller-supplied identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// The `users` table.
    Users,
    /// The `rooms` table.
    Rooms,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Rooms => "rooms",
        }
    }

    fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Users => crate::schema::USERS_COLUMNS,
            Table::Rooms => crate::schema::ROOMS_COLUMNS,
        }
    }

    fn validate_column(self, column: &str) -> Result<()> {
        if self.columns().contains(&column) {
            Ok(())
        } else {
            Err(TenantDbError::Query(format!(
                "`{column}` is not a column of `{}`",
                self.name()
            )))
        }
    }
}

/// `getTableField(table,key,value,field)`: fetch one column of the first row
/// matching an exact-match predicate. Returns `None` if no row matches.
pub async fn get_table_field(
    pool: &PgPool,
    table: Table,
    key: &str,
    value: &str,
    field: &str,
) -> Result<Option<String>> {
    table.validate_column(key)?;
    table.validate_column(field)?;

    let sql = format!(
        "SELECT {field}::text FROM {} WHERE {key} = $1",
        table.name()
    );
    let row: Option<(Option<String>,)> = sqlx::query_as(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .map_err(|e| TenantDbError::Query(e.to_string()))?;

    Ok(row.and_then(|(v,)| v))
}

/// `updateField(table,updateBy,id,field,value)`: set one column on every row
/// matching an exact-match predicate. Returns the number of rows touched.
pub async fn update_field(
    pool: &PgPool,
    table: Table,
    update_by: &str,
    id: &str,
    field: &str,
    value: Option<&str>,
) -> Result<u64> {
    table.validate_column(update_by)?;
    table.validate_column(field)?;

    let sql = format!(
        "UPDATE {} SET {field} = $1 WHERE {update_by} = $2",
        table.name()
    );
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| TenantDbError::Query(e.to_string()))?;

    Ok(result.rows_affected())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn random_secret_has_requested_length() {
        let s = random_secret(11);
        assert_eq!(s.chars().count(), 11);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn random_hex_id_is_32_hex_chars() {
        let id = random_hex_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn table_rejects_unknown_columns() {
        assert!(Table::Users.validate_column("not_a_real_column").is_err());
        assert!(Table::Users.validate_column("email").is_ok());
        assert!(Table::Rooms.validate_column("uid").is_ok());
    }
}
