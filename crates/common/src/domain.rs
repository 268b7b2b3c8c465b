//! Shared record shapes every component reads out of the broker (§3, §4.4).
//!
//! These mirror the marshmallow/`schema` validators the original used to
//! gate each entry point (`dataSchema.py`): a server record, a meeting
//! record, its nested owner, and the command envelope the HTTP admin surface
//! and command processor exchange. Unknown top-level fields are preserved
//! via `extra` rather than rejected, matching the owner/meeting schemas'
//! `Meta: unknown = INCLUDE`; the server schema had no such escape hatch, so
//! its `extra` map exists only for forward-compatible storage, not for any
//! behavior that reads it back.

use crate::secret::SecretString;
use crate::validation::{looks_like_email, require_lowercase_trimmed, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn default_map() -> Map<String, Value> {
    Map::new()
}

/// A meeting's owner (`ownerSchema`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerSpec {
    pub email: String,
    #[serde(rename = "fullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "socialUid", skip_serializing_if = "Option::is_none")]
    pub social_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl OwnerSpec {
    /// Normalize the email (`lowerstrip_email`) and check `fullName` is
    /// present (the original's `error_messages={"required": ...}`); when it
    /// isn't, callers default it to the local-part of the email rather than
    /// failing (§5.2).
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.email = require_lowercase_trimmed("owner.email", Some(&self.email))?;
        if !looks_like_email(&self.email) {
            return Err(ValidationError::invalid(
                "owner.email",
                "not a valid email address",
            ));
        }
        Ok(())
    }

    /// Display name, defaulting to the local-part of the email when absent
    /// (`ownerFullName = mDict['owner']['email'].partition('@')[0]`).
    #[must_use]
    pub fn full_name_or_default(&self) -> String {
        self.full_name.clone().unwrap_or_else(|| {
            self.email
                .split_once('@')
                .map_or_else(|| self.email.clone(), |(local, _)| local.to_string())
        })
    }
}

/// Live-streaming bridge parameters nested under a meeting record
/// (§5.3's SSH-driven `docker-compose` bridge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveStreamingSpec {
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    #[serde(rename = "streamerHost")]
    pub streamer_host: String,
    #[serde(rename = "playIntro", default)]
    pub play_intro: Option<String>,
}

/// One entry of `shareWith`/`sendInvitationLink`/`sendModeratorLink`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecipientSpec {
    #[serde(rename = "fullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(rename = "send_emails", skip_serializing_if = "Option::is_none")]
    pub send_emails: Option<bool>,
}

impl RecipientSpec {
    /// Display name, defaulting to the local-part of `email` (every one of
    /// the three recipient maps repeats this same default).
    #[must_use]
    pub fn full_name_or_default(&self, email: &str) -> String {
        self.full_name.clone().unwrap_or_else(|| {
            email
                .split_once('@')
                .map_or_else(|| email.to_string(), |(local, _)| local.to_string())
        })
    }
}

/// A scheduled meeting record (`meetingSchema`), as stored at `meeting:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: String,
    #[serde(rename = "meetingName")]
    pub meeting_name: String,
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerSpec>,
    #[serde(rename = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "meetingID", skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<String>,
    #[serde(rename = "meetingUID", skip_serializing_if = "Option::is_none")]
    pub meeting_uid: Option<String>,
    #[serde(rename = "useHomeRoom", default)]
    pub use_home_room: bool,
    #[serde(rename = "accessCode", skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(rename = "muteOnStart", skip_serializing_if = "Option::is_none")]
    pub mute_on_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome: Option<String>,
    #[serde(rename = "bannerText", skip_serializing_if = "Option::is_none")]
    pub banner_text: Option<String>,
    #[serde(rename = "maxParticipants", skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    #[serde(rename = "logoutURL", skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(rename = "autoStartRecording", skip_serializing_if = "Option::is_none")]
    pub auto_start_recording: Option<bool>,
    #[serde(
        rename = "allowStartStopRecording",
        skip_serializing_if = "Option::is_none"
    )]
    pub allow_start_stop_recording: Option<bool>,
    #[serde(rename = "preOpenMinutes", skip_serializing_if = "Option::is_none")]
    pub pre_open_minutes: Option<i64>,
    #[serde(rename = "preStartMinutes", skip_serializing_if = "Option::is_none")]
    pub pre_start_minutes: Option<i64>,
    #[serde(rename = "endAfterMinutes", skip_serializing_if = "Option::is_none")]
    pub end_after_minutes: Option<i64>,
    #[serde(rename = "reminderMinutes", skip_serializing_if = "Option::is_none")]
    pub reminder_minutes: Option<i64>,
    #[serde(rename = "liveStreaming", skip_serializing_if = "Option::is_none")]
    pub live_streaming: Option<LiveStreamingSpec>,
    #[serde(rename = "shareWith", default)]
    pub share_with: HashMap<String, RecipientSpec>,
    #[serde(rename = "sendInvitationLink", default)]
    pub send_invitation_link: HashMap<String, RecipientSpec>,
    #[serde(rename = "sendModeratorLink", default)]
    pub send_moderator_link: HashMap<String, RecipientSpec>,
    #[serde(rename = "send_emails", skip_serializing_if = "Option::is_none")]
    pub send_emails: Option<bool>,
    #[serde(rename = "mailFrom", skip_serializing_if = "Option::is_none")]
    pub mail_from: Option<String>,
    #[serde(rename = "mailFromName", skip_serializing_if = "Option::is_none")]
    pub mail_from_name: Option<String>,
    #[serde(rename = "mailTo", skip_serializing_if = "Option::is_none")]
    pub mail_to: Option<String>,
    #[serde(rename = "mailToName", skip_serializing_if = "Option::is_none")]
    pub mail_to_name: Option<String>,
    #[serde(rename = "meetingOwnerInfoTemplate", skip_serializing_if = "Option::is_none")]
    pub owner_info_template: Option<String>,
    #[serde(
        rename = "meetingOwnerStartedTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_started_template: Option<String>,
    #[serde(
        rename = "meetingOwnerReminderTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_reminder_template: Option<String>,
    #[serde(rename = "meetingShareInfoTemplate", skip_serializing_if = "Option::is_none")]
    pub share_info_template: Option<String>,
    #[serde(
        rename = "meetingInvitationInfoTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub invitation_info_template: Option<String>,
    #[serde(
        rename = "meetingModeratorInfoTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub moderator_info_template: Option<String>,
    #[serde(flatten, default = "default_map")]
    pub extra: Map<String, Value>,
}

impl MeetingRecord {
    /// `meetingSchema`'s required-field gate: id/meetingName/server must be
    /// present (serde already enforces that structurally).
    ///
    /// Deliberately does not re-check `startDate`'s future-ness — the
    /// orchestration engine calls this every tick (§4.4), including ticks
    /// long after a legitimately-scheduled `startDate` has passed, and a
    /// `startDate` gate here would make every meeting fail validation the
    /// moment it started. The one-time "was `startDate` in the future when
    /// this record was accepted" check lives in [`Self::validate_for_creation`],
    /// run only at the points where a meeting record is written wholesale
    /// (HTTP admin create/update, config-loader sync).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.meeting_name.trim().is_empty() {
            return Err(ValidationError::missing("meetingName"));
        }
        if self.server.trim().is_empty() {
            return Err(ValidationError::missing("server"));
        }
        Ok(())
    }

    /// `meetingSchema`'s full gate as applied when a meeting record is
    /// accepted wholesale: [`Self::validate`] plus `startDate`'s
    /// `is_in_future` check (`dataSchema.py`'s `@validates('startDate')`).
    ///
    /// A present `startDate` must both parse in the ledger's
    /// `"%Y-%m-%d %H:%M"` format and lie strictly after `now`; either failure
    /// is reported as [`ValidationError::NotInFuture`]. Absent `startDate` is
    /// untouched (the field is optional).
    pub fn validate_for_creation(&self, clock: &crate::time::Clock) -> Result<(), ValidationError> {
        self.validate()?;

        if let Some(start_date) = &self.start_date {
            let parsed = crate::time::parse_ledger_timestamp(start_date)
                .ok_or_else(|| ValidationError::NotInFuture {
                    field: "startDate".to_string(),
                })?;
            if parsed <= clock.now().naive_local() {
                return Err(ValidationError::NotInFuture {
                    field: "startDate".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// A conference-server record (`serverSchema`), as stored at `server:<id>`.
///
/// Deliberately not `Serialize`: `secrecy` does not implement it for
/// [`SecretString`], so a server record is never reconstructed from this
/// struct for storage — the broker always keeps the operator-submitted JSON
/// verbatim (§4.4), and this type exists only to read it back typed.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerRecord {
    pub id: String,
    #[serde(rename = "BBB_SECRET")]
    pub bbb_secret: SecretString,
    #[serde(rename = "BBB_URL")]
    pub bbb_url: String,
    pub link_base: String,
    #[serde(rename = "mailDebug", default)]
    pub mail_debug: bool,
    #[serde(default)]
    pub send_emails: bool,
    #[serde(rename = "mailTo", skip_serializing_if = "Option::is_none")]
    pub mail_to: Option<String>,
    #[serde(rename = "mailToName", skip_serializing_if = "Option::is_none")]
    pub mail_to_name: Option<String>,
    #[serde(rename = "mailFrom")]
    pub mail_from: String,
    #[serde(rename = "mailFromName")]
    pub mail_from_name: String,
    #[serde(rename = "mailPassword")]
    pub mail_password: SecretString,
    #[serde(rename = "mailServer")]
    pub mail_server: String,
    #[serde(rename = "mailUser")]
    pub mail_user: String,
    #[serde(flatten, default = "default_map")]
    pub extra: Map<String, Value>,
}

impl ServerRecord {
    /// `serverSchema`'s required-field gate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bbb_url.trim().is_empty() {
            return Err(ValidationError::missing("BBB_URL"));
        }
        if self.link_base.trim().is_empty() {
            return Err(ValidationError::missing("link_base"));
        }
        if self.mail_from.trim().is_empty() {
            return Err(ValidationError::missing("mailFrom"));
        }
        if self.mail_from_name.trim().is_empty() {
            return Err(ValidationError::missing("mailFromName"));
        }
        if self.mail_server.trim().is_empty() {
            return Err(ValidationError::missing("mailServer"));
        }
        if self.mail_user.trim().is_empty() {
            return Err(ValidationError::missing("mailUser"));
        }
        Ok(())
    }
}

/// The content type of a mail's body (`send_email`'s `contentType` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailContentType {
    Plain,
    Html,
}

impl Default for MailContentType {
    /// The original defaults to HTML whenever `contentType` is absent or
    /// anything other than the literal string `"plain"`.
    fn default() -> Self {
        Self::Html
    }
}

/// A queued mail, carried as the payload of one `mailStream` entry
/// (`send_email`'s `mail_properties` dict). `meeting_or_command_id` replaces
/// the original's trick of keying the stream field itself by the meeting or
/// command id; every producer in this system now stamps it onto the payload
/// instead, so the stream's data field name can stay uniform.
///
/// `mail_password` is a plain `String`, not [`SecretString`]: this payload
/// has to round-trip through JSON over the stream, and `secrecy` does not
/// implement `Serialize`. Carrying the SMTP password inside the queued
/// message at all is a preserved design smell (§7 REDESIGN FLAGS) rather
/// than something worth fighting the wire format over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailProperties {
    pub meeting_or_command_id: String,
    pub mail_server: String,
    pub mail_user: String,
    pub mail_password: String,
    pub mail_from: String,
    pub mail_from_name: String,
    pub mail_to: String,
    pub mail_to_name: String,
    pub mail_text: String,
    #[serde(default)]
    pub content_type: MailContentType,
}

/// The command envelope posted to `/api/v1/commands` and carried over
/// `commandStream` (`commandSchema`). `data`'s shape depends on `command`
/// and is validated per-command by the command processor, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: String,
    pub server: String,
    pub data: Value,
}

impl CommandEnvelope {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.command.trim().is_empty() {
            return Err(ValidationError::missing("command"));
        }
        if self.server.trim().is_empty() {
            return Err(ValidationError::missing("server"));
        }
        if !self.data.is_object() {
            return Err(ValidationError::invalid("data", "must be an object"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::time::Clock;
    use chrono::{Local, TimeZone};

    #[test]
    fn owner_spec_validate_normalizes_email() {
        let mut owner = OwnerSpec {
            email: "  Alice@Example.COM ".to_string(),
            full_name: None,
            social_uid: None,
            password: None,
            uid: None,
        };
        owner.validate().expect("valid");
        assert_eq!(owner.email, "alice@example.com");
        assert_eq!(owner.full_name_or_default(), "alice");
    }

    #[test]
    fn owner_spec_rejects_malformed_email() {
        let mut owner = OwnerSpec {
            email: "not-an-email".to_string(),
            full_name: None,
            social_uid: None,
            password: None,
            uid: None,
        };
        assert!(owner.validate().is_err());
    }

    #[test]
    fn meeting_record_round_trips_unknown_fields() {
        let json = serde_json::json!({
            "id": "m1",
            "meetingName": "Standup",
            "server": "prod",
            "customField": "kept"
        });
        let record: MeetingRecord = serde_json::from_value(json.clone()).expect("parses");
        assert_eq!(record.extra.get("customField"), Some(&Value::from("kept")));

        let re_encoded = serde_json::to_value(&record).expect("serializes");
        assert_eq!(re_encoded["customField"], "kept");
    }

    #[test]
    fn recipient_spec_defaults_full_name_to_local_part() {
        let recipient = RecipientSpec::default();
        assert_eq!(
            recipient.full_name_or_default("bob@example.com"),
            "bob"
        );
    }

    #[test]
    fn command_envelope_requires_object_data() {
        let envelope = CommandEnvelope {
            command: "rename_room".to_string(),
            server: "prod".to_string(),
            data: Value::String("not an object".to_string()),
        };
        assert!(envelope.validate().is_err());
    }

    fn meeting_with_start_date(start_date: &str) -> MeetingRecord {
        let json = serde_json::json!({
            "id": "m1",
            "meetingName": "Standup",
            "server": "prod",
            "startDate": start_date,
        });
        serde_json::from_value(json).expect("parses")
    }

    #[test]
    fn validate_for_creation_accepts_missing_start_date() {
        let json = serde_json::json!({ "id": "m1", "meetingName": "Standup", "server": "prod" });
        let record: MeetingRecord = serde_json::from_value(json).expect("parses");
        let clock = Clock::at(Local.with_ymd_and_hms(2026, 7, 28, 14, 30, 0).unwrap());
        assert!(record.validate_for_creation(&clock).is_ok());
    }

    #[test]
    fn validate_for_creation_accepts_future_start_date() {
        let record = meeting_with_start_date("2026-08-01 10:00");
        let clock = Clock::at(Local.with_ymd_and_hms(2026, 7, 28, 14, 30, 0).unwrap());
        assert!(record.validate_for_creation(&clock).is_ok());
    }

    #[test]
    fn validate_for_creation_rejects_past_start_date() {
        let record = meeting_with_start_date("2026-07-01 10:00");
        let clock = Clock::at(Local.with_ymd_and_hms(2026, 7, 28, 14, 30, 0).unwrap());
        let err = record.validate_for_creation(&clock).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotInFuture {
                field: "startDate".to_string()
            }
        );
    }

    #[test]
    fn validate_for_creation_rejects_malformed_start_date() {
        let record = meeting_with_start_date("not-a-date");
        let clock = Clock::at(Local.with_ymd_and_hms(2026, 7, 28, 14, 30, 0).unwrap());
        assert!(record.validate_for_creation(&clock).is_err());
    }

    #[test]
    fn validate_still_accepts_a_record_whose_start_date_has_passed() {
        // The orchestration engine's every-tick gate must keep progressing a
        // meeting after its startDate, so `validate` (unlike
        // `validate_for_creation`) never checks future-ness.
        let record = meeting_with_start_date("2026-07-01 10:00");
        assert!(record.validate().is_ok());
    }
}
