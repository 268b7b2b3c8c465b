//! The idempotent status ledger (§3, "Status ledger").
//!
//! One hash per entity, `{kind}:{id}:status`. Each field is an
//! underscore-joined path (`status`, `preOpen`, `owner_infoMailSent`,
//! `shareWith_alice@example.com`, ...) whose value is a JSON array of
//! `"{timestamp}|{code}|{message}"` strings — the *effective* state of a
//! field is the last element of that array. A write is skipped whenever the
//! new code equals the currently-effective code, so restarts never produce
//! duplicate transitions.

use crate::client::BrokerClient;
use crate::error::{BrokerError, Result};
use common::time::Clock;
use tracing::{debug, instrument};

/// Which entity family a status hash belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// `meeting:<id>:status`
    Meeting,
    /// `server:<id>:status`
    Server,
}

impl EntityKind {
    fn as_str(self) -> &'static str {
        match self {
            EntityKind::Meeting => "meeting",
            EntityKind::Server => "server",
        }
    }
}

/// One transition record in a field's history.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StatusRecord {
    /// Rendered in the ledger's `"%Y-%m-%d %H:%M"` format.
    pub timestamp: String,
    /// Three-digit status code (see §3 for the taxonomy).
    pub code: String,
    /// Human-readable progress message.
    pub message: String,
}

impl StatusRecord {
    fn encode(&self) -> String {
        format!("{}|{}|{}", self.timestamp, self.code, self.message)
    }

    fn decode(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, '|');
        let timestamp = parts.next()?.to_string();
        let code = parts.next()?.to_string();
        let message = parts.next().unwrap_or_default().to_string();
        Some(Self {
            timestamp,
            code,
            message,
        })
    }
}

/// The status ledger, built on top of the broker's hash primitives.
#[derive(Clone)]
pub struct StatusLedger {
    broker: BrokerClient,
    ttl_seconds: u64,
}

impl StatusLedger {
    /// Build a ledger whose keys are refreshed with `ttl_seconds` of TTL on
    /// every write (`keep_redis_cache` in SPEC_FULL.md §6).
    #[must_use]
    pub fn new(broker: BrokerClient, ttl_seconds: u64) -> Self {
        Self {
            broker,
            ttl_seconds,
        }
    }

    fn status_key(kind: EntityKind, id: &str) -> String {
        format!("{}:{}:status", kind.as_str(), id)
    }

    fn field_name(path: &[&str]) -> String {
        path.join("_")
    }

    /// Fetch the full transition history of one field, oldest first.
    ///
    /// Returns an empty vector if the field has never been written.
    #[instrument(skip_all, fields(kind = ?kind, id = id))]
    pub async fn history(
        &self,
        kind: EntityKind,
        id: &str,
        path: &[&str],
    ) -> Result<Vec<StatusRecord>> {
        let key = Self::status_key(kind, id);
        let field = Self::field_name(path);

        let Some(raw) = self.broker.hash_get(&key, &field).await? else {
            return Ok(Vec::new());
        };

        let entries: Vec<String> = serde_json::from_str(&raw).map_err(|e| BrokerError::Malformed {
            key: format!("{key}.{field}"),
            reason: e.to_string(),
        })?;

        Ok(entries.iter().filter_map(|s| StatusRecord::decode(s)).collect())
    }

    /// Fetch the current effective record for a field (its latest entry).
    #[instrument(skip_all, fields(kind = ?kind, id = id))]
    pub async fn effective(
        &self,
        kind: EntityKind,
        id: &str,
        path: &[&str],
    ) -> Result<Option<StatusRecord>> {
        Ok(self.history(kind, id, path).await?.into_iter().last())
    }

    /// Fetch only the effective code of a field, or `None` if it has never
    /// been written. This is the check every gating stage in the
    /// orchestration engine performs before deciding whether to act.
    pub async fn effective_code(
        &self,
        kind: EntityKind,
        id: &str,
        path: &[&str],
    ) -> Result<Option<String>> {
        Ok(self.effective(kind, id, path).await?.map(|r| r.code))
    }

    /// Append a new transition, unless `code` already equals the field's
    /// current effective code. Returns `true` if a write happened.
    ///
    /// On a real write, the key's TTL is refreshed to `ttl_seconds` — the
    /// ledger-wide equivalent of the original's `keyTouch`/`keyExpire` pair.
    #[instrument(skip_all, fields(kind = ?kind, id = id, code = code))]
    pub async fn set_status(
        &self,
        kind: EntityKind,
        id: &str,
        path: &[&str],
        code: &str,
        message: &str,
        clock: &Clock,
    ) -> Result<bool> {
        let key = Self::status_key(kind, id);
        let field = Self::field_name(path);

        let mut entries: Vec<String> = match self.broker.hash_get(&key, &field).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| BrokerError::Malformed {
                key: format!("{key}.{field}"),
                reason: e.to_string(),
            })?,
            None => Vec::new(),
        };

        if let Some(last) = entries.last() {
            if let Some(record) = StatusRecord::decode(last) {
                if record.code == code {
                    debug!(
                        target: "broker.ledger",
                        key = %key,
                        field = %field,
                        code,
                        "status unchanged, skipping write"
                    );
                    return Ok(false);
                }
            }
        }

        let record = StatusRecord {
            timestamp: clock.format_for_ledger(),
            code: code.to_string(),
            message: message.to_string(),
        };
        entries.push(record.encode());

        let encoded = serde_json::to_string(&entries).map_err(|e| BrokerError::Malformed {
            key: format!("{key}.{field}"),
            reason: e.to_string(),
        })?;

        self.broker.hash_put(&key, &field, &encoded).await?;
        self.broker.key_touch(&key).await?;
        self.broker.key_expire(&key, self.ttl_seconds).await?;

        debug!(
            target: "broker.ledger",
            key = %key,
            field = %field,
            code,
            "status transition recorded"
        );

        Ok(true)
    }

    /// Delete an entity's entire status hash, used when a meeting/server
    /// record is removed.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        let key = Self::status_key(kind, id);
        self.broker.delete_key(&key).await
    }

    /// Delete a single field of an entity's status hash, used by the HTTP
    /// admin surface's per-field `DELETE` endpoint.
    pub async fn delete_field(&self, kind: EntityKind, id: &str, path: &[&str]) -> Result<()> {
        let key = Self::status_key(kind, id);
        let field = Self::field_name(path);
        self.broker.hash_delete(&key, &field).await
    }

    /// Fetch every field of an entity's status hash, decoded into its full
    /// transition history, keyed by field name (the HTTP admin surface's
    /// `GET /meetings/<id>/status` response).
    pub async fn history_all(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<std::collections::HashMap<String, Vec<StatusRecord>>> {
        let key = Self::status_key(kind, id);
        let raw = self.broker.hash_get_all(&key).await?;

        let mut out = std::collections::HashMap::new();
        for (field, value) in raw {
            let entries: Vec<String> = serde_json::from_str(&value).map_err(|e| BrokerError::Malformed {
                key: format!("{key}.{field}"),
                reason: e.to_string(),
            })?;
            let decoded = entries.iter().filter_map(|s| StatusRecord::decode(s)).collect();
            out.insert(field, decoded);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_pipe_encoding() {
        let record = StatusRecord {
            timestamp: "2026-07-28 14:30".to_string(),
            code: "220".to_string(),
            message: "started, users joined".to_string(),
        };
        let encoded = record.encode();
        assert_eq!(encoded, "2026-07-28 14:30|220|started, users joined");

        let decoded = StatusRecord::decode(&encoded).expect("decodes");
        assert_eq!(decoded, record);
    }

    #[test]
    fn decode_rejects_malformed_entries() {
        assert!(StatusRecord::decode("not-enough-fields").is_none());
    }

    #[test]
    fn field_name_joins_with_underscore() {
        let path = ["shareWith", "alice@example.com", "sendShareMail"];
        assert_eq!(
            StatusLedger::field_name(&path),
            "shareWith_alice@example.com_sendShareMail"
        );
    }

    #[test]
    fn status_key_uses_singular_canonical_form() {
        assert_eq!(
            StatusLedger::status_key(EntityKind::Meeting, "m1"),
            "meeting:m1:status"
        );
        assert_eq!(
            StatusLedger::status_key(EntityKind::Server, "s1"),
            "server:s1:status"
        );
    }
}
