//! SMTP delivery of one queued mail (`send_email` in `slMailProcessor.py`).
//!
//! Every field the original's `config_exists` gate checked is already
//! structurally required on [`MailProperties`], so that check has no
//! counterpart here — a malformed payload simply fails to deserialize
//! upstream in [`crate::drain`].

use common::domain::{MailContentType, MailProperties};
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

fn mailbox(name: &str, address: &str) -> Result<Mailbox, String> {
    format!("\"{name}\" <{address}>").parse().map_err(|e| format!("{e}"))
}

/// Send one mail. Returns `true` on successful delivery, `false` on any
/// failure — malformed recipient, unreachable server, or rejected
/// credentials all collapse to the same outcome, matching `send_email`'s
/// `try/except Exception` catch-all.
pub async fn send(mail: &MailProperties) -> bool {
    let from = match mailbox(&mail.mail_from_name, &mail.mail_from) {
        Ok(mailbox) => mailbox,
        Err(err) => {
            warn!(target: "mail_worker.smtp", %err, "malformed mailFrom");
            return false;
        }
    };
    let to = match mailbox(&mail.mail_to_name, &mail.mail_to) {
        Ok(mailbox) => mailbox,
        Err(err) => {
            warn!(target: "mail_worker.smtp", %err, "malformed mailTo");
            return false;
        }
    };

    let content_type = match mail.content_type {
        MailContentType::Plain => header::ContentType::parse("text/plain; charset=utf-8"),
        MailContentType::Html => header::ContentType::parse("text/html; charset=utf-8"),
    };
    let content_type = match content_type {
        Ok(content_type) => content_type,
        Err(err) => {
            warn!(target: "mail_worker.smtp", %err, "failed to build content type");
            return false;
        }
    };

    let message = match Message::builder()
        .from(from)
        .to(to)
        .header(content_type)
        .body(mail.mail_text.clone())
    {
        Ok(message) => message,
        Err(err) => {
            warn!(target: "mail_worker.smtp", %err, "failed to build message");
            return false;
        }
    };

    let transport = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.mail_server) {
        Ok(builder) => builder
            .credentials(Credentials::new(mail.mail_user.clone(), mail.mail_password.clone()))
            .build(),
        Err(err) => {
            warn!(target: "mail_worker.smtp", %err, server = %mail.mail_server, "failed to build SMTP transport");
            return false;
        }
    };

    match transport.send(message).await {
        Ok(_) => {
            debug!(target: "mail_worker.smtp", to = %mail.mail_to, "mail sent");
            true
        }
        Err(err) => {
            warn!(target: "mail_worker.smtp", %err, to = %mail.mail_to, "error sending email");
            false
        }
    }
}
