//! Broker adapter: a process-wide connection to the Redis-backed store that
//! every cooperating component reads and writes.
//!
//! Owns three namespaces (§4.1): keyed records (`server:<id>`, `meeting:<id>`),
//! membership sets (`servers`, `meetings`), and append-only streams with
//! consumer groups (`commandStream`/`commandNotifications`,
//! `mailStream`/`mailNotifications`). The status-ledger hash operations live
//! in [`crate::ledger`], built on top of the primitives here.

use crate::error::{BrokerError, Result};
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client};
use tracing::{debug, instrument, warn};

/// A message read off a stream, not yet acknowledged.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// The stream entry id, used to acknowledge it later.
    pub id: String,
    /// The payload stored under the entry's `data` field.
    pub data: String,
}

/// Broker client. Cheaply cloneable: the underlying `MultiplexedConnection`
/// is designed for concurrent use without locking, so every caller clones
/// rather than sharing behind a mutex.
#[derive(Clone)]
pub struct BrokerClient {
    connection: MultiplexedConnection,
}

impl BrokerClient {
    /// Open a connection to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Connection`] if the URL cannot be parsed or the
    /// connection cannot be established. Callers treat this as fatal at
    /// startup (§4.1's failure model).
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            warn!(target: "broker.client", error = %e, "failed to open broker client");
            BrokerError::Connection(e.to_string())
        })?;

        let connection = client.get_multiplexed_async_connection().await.map_err(|e| {
            warn!(target: "broker.client", error = %e, "failed to connect to broker");
            BrokerError::Connection(e.to_string())
        })?;

        Ok(Self { connection })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    // -- Keyed records ----------------------------------------------------

    /// Fetch the raw JSON value of `{ns}:{id}`, or `None` if absent.
    #[instrument(skip_all, fields(ns = ns, id = id))]
    pub async fn get_record(&self, ns: &str, id: &str) -> Result<Option<String>> {
        let mut conn = self.conn();
        let key = format!("{ns}:{id}");
        conn.get(&key).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, key = %key, "get_record failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// Replace-whole-record write of `{ns}:{id}`, with an optional TTL.
    #[instrument(skip_all, fields(ns = ns, id = id))]
    pub async fn put_record(
        &self,
        ns: &str,
        id: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<()> {
        let mut conn = self.conn();
        let key = format!("{ns}:{id}");
        match ttl_seconds {
            Some(ttl) => conn.set_ex(&key, value, ttl).await,
            None => conn.set(&key, value).await,
        }
        .map_err(|e| {
            warn!(target: "broker.client", error = %e, key = %key, "put_record failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// Delete `{ns}:{id}`.
    #[instrument(skip_all, fields(ns = ns, id = id))]
    pub async fn delete_record(&self, ns: &str, id: &str) -> Result<()> {
        self.delete_key(&format!("{ns}:{id}")).await
    }

    /// Delete an arbitrary key, not necessarily of the `{ns}:{id}` record
    /// shape (used for status hashes, whose key already embeds its own
    /// `:status` suffix).
    #[instrument(skip_all, fields(key = key))]
    pub async fn delete_key(&self, key: &str) -> Result<()> {
        let mut conn = self.conn();
        conn.del(key).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, key = %key, "delete_key failed");
            BrokerError::Command(e.to_string())
        })
    }

    // -- Membership sets ----------------------------------------------------

    /// Add `member` to the set `set_name`.
    #[instrument(skip_all, fields(set_name = set_name, member = member))]
    pub async fn set_add(&self, set_name: &str, member: &str) -> Result<()> {
        let mut conn = self.conn();
        conn.sadd(set_name, member).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, set_name, "set_add failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// Remove `member` from the set `set_name`.
    #[instrument(skip_all, fields(set_name = set_name, member = member))]
    pub async fn set_remove(&self, set_name: &str, member: &str) -> Result<()> {
        let mut conn = self.conn();
        conn.srem(set_name, member).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, set_name, "set_remove failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// List every member of `set_name`.
    #[instrument(skip_all, fields(set_name = set_name))]
    pub async fn set_members(&self, set_name: &str) -> Result<Vec<String>> {
        let mut conn = self.conn();
        conn.smembers(set_name).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, set_name, "set_members failed");
            BrokerError::Command(e.to_string())
        })
    }

    // -- Streams --------------------------------------------------------

    /// Create `group` on `stream` at id `0-0`, creating the stream if it
    /// does not yet exist (`MKSTREAM`). Idempotent: an already-existing
    /// group is not an error (§4.1).
    #[instrument(skip_all, fields(stream = stream, group = group))]
    pub async fn ensure_group(&self, stream: &str, group: &str) -> Result<()> {
        let mut conn = self.conn();
        let result: std::result::Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream)
            .arg(group)
            .arg("0-0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(target: "broker.client", stream, group, "consumer group already exists");
                Ok(())
            }
            Err(e) => {
                warn!(target: "broker.client", error = %e, stream, group, "ensure_group failed");
                Err(BrokerError::Command(e.to_string()))
            }
        }
    }

    /// Append a payload to `stream` under its single `data` field.
    #[instrument(skip_all, fields(stream = stream))]
    pub async fn stream_append(&self, stream: &str, payload: &str) -> Result<String> {
        let mut conn = self.conn();
        conn.xadd(stream, "*", &[("data", payload)])
            .await
            .map_err(|e| {
                warn!(target: "broker.client", error = %e, stream, "stream_append failed");
                BrokerError::Command(e.to_string())
            })
    }

    /// Read up to `count` messages from `stream` on behalf of `consumer` in
    /// `group`. Pass `"0"` as `cursor` to drain this consumer's own pending
    /// entries, or `">"` to read new messages never delivered to the group.
    #[instrument(skip_all, fields(stream = stream, group = group, consumer = consumer, cursor = cursor))]
    pub async fn stream_read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        cursor: &str,
        count: usize,
        block_ms: Option<usize>,
    ) -> Result<Vec<StreamMessage>> {
        let mut conn = self.conn();
        let mut opts = StreamReadOptions::default().group(group, consumer).count(count);
        if let Some(block) = block_ms {
            opts = opts.block(block);
        }

        let reply: StreamReadReply = conn
            .xread_options(&[stream], &[cursor], &opts)
            .await
            .map_err(|e| {
                warn!(target: "broker.client", error = %e, stream, group, "stream_read_group failed");
                BrokerError::Command(e.to_string())
            })?;

        let mut messages = Vec::new();
        for stream_key in reply.keys {
            for entry in stream_key.ids {
                let data: String = entry
                    .map
                    .get("data")
                    .and_then(|v| redis::from_redis_value::<String>(v).ok())
                    .unwrap_or_default();
                messages.push(StreamMessage { id: entry.id, data });
            }
        }
        Ok(messages)
    }

    /// Acknowledge a processed message so it is removed from the group's
    /// pending-entries list.
    #[instrument(skip_all, fields(stream = stream, group = group, id = id))]
    pub async fn stream_ack(&self, stream: &str, group: &str, id: &str) -> Result<()> {
        let mut conn = self.conn();
        conn.xack(stream, group, &[id]).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, stream, group, id, "stream_ack failed");
            BrokerError::Command(e.to_string())
        })
    }

    // -- Hashes -----------------------------------------------------------

    /// Fetch one field of a hash key.
    #[instrument(skip_all, fields(key = key, field = field))]
    pub async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn();
        conn.hget(key, field).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, key, field, "hash_get failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// Set one field of a hash key.
    #[instrument(skip_all, fields(key = key, field = field))]
    pub async fn hash_put(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn();
        conn.hset(key, field, value).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, key, field, "hash_put failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// Fetch every field of a hash key, or an empty map if the key is
    /// absent (used by the HTTP admin surface to return a meeting's whole
    /// status ledger in one response).
    #[instrument(skip_all, fields(key = key))]
    pub async fn hash_get_all(&self, key: &str) -> Result<std::collections::HashMap<String, String>> {
        let mut conn = self.conn();
        conn.hgetall(key).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, key, "hash_get_all failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// Delete one field of a hash key.
    #[instrument(skip_all, fields(key = key, field = field))]
    pub async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.conn();
        conn.hdel(key, field).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, key, field, "hash_delete failed");
            BrokerError::Command(e.to_string())
        })
    }

    // -- Key lifecycle ------------------------------------------------------

    /// Refresh a key's recency without changing its TTL (`TOUCH`).
    #[instrument(skip_all, fields(key = key))]
    pub async fn key_touch(&self, key: &str) -> Result<()> {
        let mut conn = self.conn();
        let _: i64 = redis::cmd("TOUCH")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "broker.client", error = %e, key, "key_touch failed");
                BrokerError::Command(e.to_string())
            })?;
        Ok(())
    }

    /// Set (or refresh) a key's TTL in seconds.
    #[instrument(skip_all, fields(key = key, seconds = seconds))]
    pub async fn key_expire(&self, key: &str, seconds: u64) -> Result<()> {
        let mut conn = self.conn();
        conn.expire(key, seconds as i64).await.map_err(|e| {
            warn!(target: "broker.client", error = %e, key, "key_expire failed");
            BrokerError::Command(e.to_string())
        })
    }

    /// Trigger an asynchronous background save, matching the shutdown
    /// sequence every worker follows before disconnecting.
    #[instrument(skip_all)]
    pub async fn bgsave(&self) -> Result<()> {
        let mut conn = self.conn();
        redis::cmd("BGSAVE")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "broker.client", error = %e, "bgsave failed");
                BrokerError::Command(e.to_string())
            })
    }
}
