//! Push a loaded [`ConfigFile`] into the broker (`slReadConfig.py`'s
//! non-import branch).
//!
//! Deletion of entries removed from the config file is implemented as an
//! in-memory set difference against the membership set read before any
//! writes happen this run, rather than the original's `RENAME`/`SDIFFSTORE`
//! pair — the broker client exposes no such primitives, and the observable
//! outcome (only entries absent from both the new config *and* the
//! previous run's membership set get deleted) is identical.

use crate::file::ConfigFile;
use broker::ledger::EntityKind;
use broker::{BrokerClient, StatusLedger};
use common::domain::{CommandEnvelope, MeetingRecord, ServerRecord};
use common::time::Clock;
use std::collections::HashSet;
use tracing::{debug, error, info};

async fn sync_servers(broker: &BrokerClient, ledger: &StatusLedger, config: &ConfigFile, ttl_seconds: u64, delete_removed: bool) {
    let previous: HashSet<String> = match broker.set_members("servers").await {
        Ok(members) => members.into_iter().collect(),
        Err(err) => {
            error!(target: "config_loader.sync", %err, "failed to read previous servers set");
            HashSet::new()
        }
    };

    for (id, value) in &config.servers {
        debug!(target: "config_loader.sync", id, "processing server");
        let record: ServerRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(err) => {
                error!(target: "config_loader.sync", %err, id, "please provide all required fields for the server");
                continue;
            }
        };
        if let Err(err) = record.validate() {
            error!(target: "config_loader.sync", %err, id, "please provide all required fields for the server");
            continue;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                error!(target: "config_loader.sync", %err, id, "failed to serialize server");
                continue;
            }
        };

        if let Err(err) = broker.set_add("servers", id).await {
            error!(target: "config_loader.sync", %err, id, "failed to add server to queue");
            continue;
        }
        if let Err(err) = broker.put_record("server", id, &payload, Some(ttl_seconds)).await {
            error!(target: "config_loader.sync", %err, id, "failed to add server to queue");
            continue;
        }
        info!(target: "config_loader.sync", id, "added server");
    }

    if delete_removed {
        for id in previous.difference(&config.servers.keys().cloned().collect()) {
            info!(target: "config_loader.sync", id, "remove server");
            if let Err(err) = broker.delete_record("server", id).await {
                error!(target: "config_loader.sync", %err, id, "failed to delete server record");
            }
            if let Err(err) = ledger.delete(EntityKind::Server, id).await {
                error!(target: "config_loader.sync", %err, id, "failed to delete server status");
            }
            if let Err(err) = broker.set_remove("servers", id).await {
                error!(target: "config_loader.sync", %err, id, "failed to remove server from set");
            }
        }
    }
}

async fn sync_meetings(broker: &BrokerClient, ledger: &StatusLedger, config: &ConfigFile, ttl_seconds: u64, delete_removed: bool) {
    let previous: HashSet<String> = match broker.set_members("meetings").await {
        Ok(members) => members.into_iter().collect(),
        Err(err) => {
            error!(target: "config_loader.sync", %err, "failed to read previous meetings set");
            HashSet::new()
        }
    };

    for (id, value) in &config.meetings {
        debug!(target: "config_loader.sync", id, "processing meeting");
        let record: MeetingRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(err) => {
                error!(target: "config_loader.sync", %err, id, "please provide all required fields for the meeting");
                continue;
            }
        };
        if let Err(err) = record.validate_for_creation(&Clock::system()) {
            error!(target: "config_loader.sync", %err, id, "please provide all required fields for the meeting");
            continue;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                error!(target: "config_loader.sync", %err, id, "failed to serialize meeting");
                continue;
            }
        };

        if let Err(err) = broker.set_add("meetings", id).await {
            error!(target: "config_loader.sync", %err, id, "failed to add meeting to queue");
            continue;
        }
        if let Err(err) = broker.put_record("meeting", id, &payload, Some(ttl_seconds)).await {
            error!(target: "config_loader.sync", %err, id, "failed to add meeting to queue");
            continue;
        }
        info!(target: "config_loader.sync", id, "added meeting");
    }

    if delete_removed {
        for id in previous.difference(&config.meetings.keys().cloned().collect()) {
            info!(target: "config_loader.sync", id, "remove meeting");
            if let Err(err) = broker.delete_record("meeting", id).await {
                error!(target: "config_loader.sync", %err, id, "failed to delete meeting record");
            }
            if let Err(err) = ledger.delete(EntityKind::Meeting, id).await {
                error!(target: "config_loader.sync", %err, id, "failed to delete meeting status");
            }
            if let Err(err) = broker.set_remove("meetings", id).await {
                error!(target: "config_loader.sync", %err, id, "failed to remove meeting from set");
            }
        }
    }
}

async fn sync_commands(broker: &BrokerClient, config: &ConfigFile) {
    for (id, value) in &config.commands {
        debug!(target: "config_loader.sync", id, "processing command");
        let envelope: CommandEnvelope = match serde_json::from_value(value.clone()) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(target: "config_loader.sync", %err, id, "please provide all required fields for the command");
                continue;
            }
        };
        if let Err(err) = envelope.validate() {
            error!(target: "config_loader.sync", %err, id, "please provide all required fields for the command");
            continue;
        }

        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(err) => {
                error!(target: "config_loader.sync", %err, id, "failed to serialize command");
                continue;
            }
        };

        match broker.stream_append("commandStream", &payload).await {
            Ok(_) => info!(target: "config_loader.sync", id, "queued command"),
            Err(err) => error!(target: "config_loader.sync", %err, id, "failed to queue command"),
        }
    }
}

/// Push every section of `config` into the broker, honoring `delete_removed`
/// for servers/meetings (commands have no deletion concept: they are
/// one-shot entries queued onto `commandStream`, not a membership set).
pub async fn sync(broker: &BrokerClient, ledger: &StatusLedger, config: &ConfigFile, ttl_seconds: u64, delete_removed: bool) {
    sync_servers(broker, ledger, config, ttl_seconds, delete_removed).await;
    sync_meetings(broker, ledger, config, ttl_seconds, delete_removed).await;
    sync_commands(broker, config).await;
}
