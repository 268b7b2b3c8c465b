//! Operator query dispatch for `http-admin query ...` (§11), grounded on
//! `slCli.py`'s `--find_meeting`/`--showMeetings`/`--room_links` flags.
//!
//! Each subcommand resolves the server record named on the command line,
//! talks to that server's BBB API directly, and prints its findings to
//! stdout — there is no stored state to update, mirroring the original
//! script's one-shot, print-and-exit design.

use crate::config::{Args, FindMeetingArgs, QueryCommand, RoomLinksArgs, ServerArgs, TestEmailArgs};
use broker::BrokerClient;
use common::config::DatabaseConfig;
use common::domain::{MailContentType, MailProperties, ServerRecord};
use common::secret::{ExposeSecret, SecretString};
use conference_api::{ConferenceApiClient, JoinRole};
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tenant_db::{RoomKey, RoomsRepository};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("broker error: {0}")]
    Broker(#[from] broker::BrokerError),
    #[error("tenant database error: {0}")]
    TenantDb(#[from] tenant_db::TenantDbError),
    #[error("server {0} is not configured")]
    UnknownServer(String),
    #[error("server {0} record is malformed: {1}")]
    MalformedServer(String, String),
    #[error("room {0} not found")]
    UnknownRoom(String),
}

async fn load_server(broker: &BrokerClient, server_id: &str) -> Result<ServerRecord, QueryError> {
    let raw = broker
        .get_record("server", server_id)
        .await?
        .ok_or_else(|| QueryError::UnknownServer(server_id.to_string()))?;
    let record: ServerRecord = serde_json::from_str(&raw)
        .map_err(|err| QueryError::MalformedServer(server_id.to_string(), err.to_string()))?;
    record
        .validate()
        .map_err(|err| QueryError::MalformedServer(server_id.to_string(), err.to_string()))?;
    Ok(record)
}

fn conference_client(server: &ServerRecord) -> ConferenceApiClient {
    ConferenceApiClient::new(server.bbb_url.clone(), server.bbb_secret.clone())
}

/// Dispatch one `query` subcommand, connecting to the broker (and, for
/// `room-links`, the tenant database) as needed.
pub async fn run(args: &Args, broker: &BrokerClient, command: QueryCommand) -> Result<(), QueryError> {
    match command {
        QueryCommand::FindMeeting(found) => find_meeting(broker, found).await,
        QueryCommand::ListMeetings(list) => list_meetings(broker, list).await,
        QueryCommand::RoomLinks(links) => room_links(args, broker, links).await,
        QueryCommand::TestEmail(email) => test_email(broker, email).await,
    }
}

async fn find_meeting(broker: &BrokerClient, found: FindMeetingArgs) -> Result<(), QueryError> {
    let server = load_server(broker, &found.server.server).await?;
    let client = conference_client(&server);

    let summaries = client.get_meetings().await;
    let Some(summary) = summaries
        .into_iter()
        .find(|m| m.meeting_name.as_deref().unwrap_or_default().contains(&found.title))
    else {
        println!("no running meeting matching '{}' on {}", found.title, found.server.server);
        return Ok(());
    };

    println!("found running meeting: {}", summary.meeting_name.as_deref().unwrap_or(&summary.meeting_id));
    println!("  meetingID: {}", summary.meeting_id);
    println!("  participants: {}", summary.participant_count.unwrap_or_default());

    if let Some(url) = client
        .join_url(&summary.meeting_id, "system_administrator", JoinRole::Attendee, None)
        .await
    {
        println!("  joinAttendeeUrl: {url}");
    }
    if let Some(url) = client
        .join_url(&summary.meeting_id, "system_administrator", JoinRole::Moderator, None)
        .await
    {
        println!("  joinModeratorUrl: {url}");
    }
    Ok(())
}

async fn list_meetings(broker: &BrokerClient, list: ServerArgs) -> Result<(), QueryError> {
    let server = load_server(broker, &list.server).await?;
    let client = conference_client(&server);

    let summaries = client.get_meetings().await;
    if summaries.is_empty() {
        println!("no meetings running on {}", list.server);
        return Ok(());
    }

    for summary in summaries {
        println!("{}", summary.meeting_name.as_deref().unwrap_or("(untitled)"));
        println!("  ID: {}", summary.meeting_id);
        println!("  running: {}", summary.running.unwrap_or(false));
        println!("  participants: {}", summary.participant_count.unwrap_or_default());
        println!();
    }
    Ok(())
}

async fn room_links(args: &Args, broker: &BrokerClient, links: RoomLinksArgs) -> Result<(), QueryError> {
    let server = load_server(broker, &links.server.server).await?;
    let client = conference_client(&server);

    let db_config = DatabaseConfig {
        db_name: args.db_name.clone(),
        db_user: args.db_user.clone(),
        db_password: SecretString::from(args.db_password.clone()),
        db_host: args.db_host.clone(),
        db_port: args.db_port,
        max_connections: args.db_max_connections,
    };
    let pool = tenant_db::connect(&db_config).await?;

    let Some(room_id) = RoomsRepository::find_id(&pool, RoomKey::Uid, &links.room_uid).await? else {
        return Err(QueryError::UnknownRoom(links.room_uid));
    };
    let Some(room) = RoomsRepository::fetch_row(&pool, room_id).await? else {
        return Err(QueryError::UnknownRoom(links.room_uid));
    };

    let moderator_link = client
        .join_url(&room.bbb_id, "Moderator", JoinRole::Moderator, Some(&room.moderator_pw))
        .await;
    let attendee_link = client
        .join_url(&room.bbb_id, "Attendee", JoinRole::Attendee, Some(&room.attendee_pw))
        .await;
    let meeting_link = format!("{}/{}", server.link_base, room.uid);

    println!("Room: {}", room.name);
    println!("Meeting Link: {meeting_link}");
    if let Some(link) = moderator_link {
        println!("Moderator Link: {link}");
    }
    if let Some(link) = attendee_link {
        println!("Attendee Link: {link}");
    }
    Ok(())
}

async fn test_email(broker: &BrokerClient, email: TestEmailArgs) -> Result<(), QueryError> {
    let server = load_server(broker, &email.server.server).await?;

    let mail = MailProperties {
        meeting_or_command_id: "query-test-email".to_string(),
        mail_server: server.mail_server.clone(),
        mail_user: server.mail_user.clone(),
        mail_password: server.mail_password.expose_secret().to_string(),
        mail_from: server.mail_from.clone(),
        mail_from_name: server.mail_from_name.clone(),
        mail_to: email.to.clone(),
        mail_to_name: email.to.clone(),
        mail_text: "This is a test message sent by the schedulight admin query tool.".to_string(),
        content_type: MailContentType::Plain,
    };

    if send_test_mail(&mail).await {
        println!("test mail sent to {}", email.to);
    } else {
        println!("failed to send test mail to {}, see logs for details", email.to);
    }
    Ok(())
}

/// Grounded on `mail-worker::smtp::send` (a binary crate with no library
/// target to import from), trimmed to the one-shot case this query needs.
async fn send_test_mail(mail: &MailProperties) -> bool {
    let from: Mailbox = match format!("\"{}\" <{}>", mail.mail_from_name, mail.mail_from).parse() {
        Ok(mailbox) => mailbox,
        Err(err) => {
            warn!(target: "http_admin.query", %err, "malformed mailFrom");
            return false;
        }
    };
    let to: Mailbox = match format!("\"{}\" <{}>", mail.mail_to_name, mail.mail_to).parse() {
        Ok(mailbox) => mailbox,
        Err(err) => {
            warn!(target: "http_admin.query", %err, "malformed mailTo");
            return false;
        }
    };

    let Ok(content_type) = header::ContentType::parse("text/plain; charset=utf-8") else {
        warn!(target: "http_admin.query", "failed to parse static content type");
        return false;
    };

    let message = match Message::builder().from(from).to(to).header(content_type).body(mail.mail_text.clone()) {
        Ok(message) => message,
        Err(err) => {
            warn!(target: "http_admin.query", %err, "failed to build test message");
            return false;
        }
    };

    let transport = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.mail_server) {
        Ok(builder) => builder
            .credentials(Credentials::new(mail.mail_user.clone(), mail.mail_password.clone()))
            .build(),
        Err(err) => {
            warn!(target: "http_admin.query", %err, server = %mail.mail_server, "failed to build SMTP transport");
            return false;
        }
    };

    match transport.send(message).await {
        Ok(_) => true,
        Err(err) => {
            warn!(target: "http_admin.query", %err, "error sending test mail");
            false
        }
    }
}
