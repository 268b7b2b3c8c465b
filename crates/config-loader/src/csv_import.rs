//! Meetings CSV import (`slReadConfig.py`'s `--importCSV` branch).
//!
//! Each row is `givenname;sn;email;password;startdate;room_url;live_url;
//! title;server` and becomes one meeting entry keyed by the owner email
//! with `@`/`.` replaced by `_`, carrying a fixed set of `*Template`
//! overrides and a live-streaming block derived from `live_url` — matching
//! the original byte for byte, including its `logoutURL` typo
//! (`importet.logout.url`) and its hardcoded `maxParticipants`/intro path.

use crate::file::ConfigFile;
use common::domain::{LiveStreamingSpec, MeetingRecord, OwnerSpec};
use std::path::Path;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum CsvImportError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },
}

fn meeting_key(email: &str) -> String {
    email.replace('@', "_").replace('.', "_")
}

fn build_meeting(row: &csv::StringRecord, server: &str) -> Option<MeetingRecord> {
    if row.len() != 9 {
        warn!(target: "config_loader.csv_import", fields = row.len(), "skipping malformed CSV row");
        return None;
    }

    let given_name = row.get(0).unwrap_or("").trim().to_string();
    let surname = row.get(1).unwrap_or("").trim().to_string();
    let orig_email = row.get(2).unwrap_or("").trim().to_string();
    let email = orig_email.to_lowercase();
    let password = row.get(3).unwrap_or("").trim().to_string();
    let start_date = row.get(4).unwrap_or("").trim().to_string();
    let live_url = row.get(6).unwrap_or("").trim().to_string();
    let title = row.get(7).unwrap_or("").to_string();

    let full_name = format!("{given_name} {surname}");
    let key = meeting_key(&email);

    Some(MeetingRecord {
        id: key,
        meeting_name: full_name.clone(),
        server: server.to_string(),
        owner: Some(OwnerSpec {
            email,
            full_name: Some(full_name),
            social_uid: Some(format!("CN={orig_email},OU=USERS,OU=EXTERNAL,DC=ldap,DC=domain,DC=tld")),
            password: Some(password),
            uid: None,
        }),
        start_date: if start_date == "0000-00-00" { None } else { Some(start_date) },
        meeting_id: None,
        meeting_uid: None,
        use_home_room: true,
        access_code: None,
        mute_on_start: Some(true),
        welcome: None,
        banner_text: None,
        max_participants: Some(150),
        logout_url: Some("importet.logout.url".to_string()),
        record: None,
        duration: None,
        auto_start_recording: None,
        allow_start_stop_recording: None,
        pre_open_minutes: None,
        pre_start_minutes: None,
        end_after_minutes: None,
        reminder_minutes: None,
        live_streaming: Some(LiveStreamingSpec {
            target_url: format!("rtmp://{live_url}/stream/bbb"),
            streamer_host: live_url,
            play_intro: Some("/video/5min.mp4".to_string()),
        }),
        share_with: Default::default(),
        send_invitation_link: Default::default(),
        send_moderator_link: Default::default(),
        send_emails: None,
        mail_from: None,
        mail_from_name: None,
        mail_to: None,
        mail_to_name: None,
        owner_info_template: Some("imported-meetingOwnerInfoTemplate.j2".to_string()),
        owner_started_template: Some("imported-meetingOwnerStartedTemplate.j2".to_string()),
        owner_reminder_template: Some("imported-meetingOwnerReminderTemplate.j2".to_string()),
        share_info_template: Some("imported-meetingShareInfoTemplate.j2".to_string()),
        invitation_info_template: Some("imported-meetingInvitationInfoTemplate.j2".to_string()),
        moderator_info_template: Some("imported-meetingModeratorInfoTemplate.j2".to_string()),
        extra: serde_json::json!({ "meetingTitle": title }).as_object().cloned().unwrap_or_default(),
    })
}

/// Merge every row of `csv_path` into `config.meetings`, keyed by email.
pub fn import(csv_path: &Path, config: &mut ConfigFile) -> Result<usize, CsvImportError> {
    let raw = std::fs::read_to_string(csv_path).map_err(|source| CsvImportError::Read {
        path: csv_path.display().to_string(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new().delimiter(b';').has_headers(false).from_reader(raw.as_bytes());

    let mut imported = 0;
    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                error!(target: "config_loader.csv_import", %err, "could not parse CSV row");
                continue;
            }
        };

        let Some(server) = row.get(8).map(str::trim) else {
            warn!(target: "config_loader.csv_import", "skipping row with no server column");
            continue;
        };

        let Some(meeting) = build_meeting(&row, server) else {
            continue;
        };

        let key = meeting.id.clone();
        match serde_json::to_value(&meeting) {
            Ok(value) => {
                config.meetings.insert(key, value);
                imported += 1;
            }
            Err(err) => error!(target: "config_loader.csv_import", %err, "failed to serialize imported meeting"),
        }
    }

    Ok(imported)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::file::ConfigFile;
    use std::io::Write;

    #[test]
    fn meeting_key_replaces_at_and_dot() {
        assert_eq!(meeting_key("alice.smith@example.com"), "alice_smith_example_com");
    }

    #[test]
    fn import_merges_rows_into_meetings() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "Alice;Smith;Alice@Example.com;secret;2026-08-01 10:00;;stream.example.com;Standup;prod").expect("write");

        let mut config = ConfigFile::default();
        let imported = import(file.path(), &mut config).expect("import succeeds");

        assert_eq!(imported, 1);
        let meeting = config.meetings.get("alice_example_com").expect("meeting present");
        assert_eq!(meeting["server"], "prod");
        assert_eq!(meeting["owner"]["email"], "alice@example.com");
        assert_eq!(meeting["useHomeRoom"], true);
    }

    #[test]
    fn import_skips_placeholder_start_date() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "Bob;Jones;bob@example.com;secret;0000-00-00;;stream.example.com;Standup;prod").expect("write");

        let mut config = ConfigFile::default();
        import(file.path(), &mut config).expect("import succeeds");

        let meeting = config.meetings.get("bob_example_com").expect("meeting present");
        assert!(meeting.get("startDate").is_none());
    }
}
