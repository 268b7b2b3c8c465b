//! HTTP client for a single BBB conference server (§4.3).
//!
//! Every call here signs its own query string via [`crate::checksum`] and
//! parses the response body via [`crate::xml`]. There is no session state
//! beyond the base URL and shared secret — BBB's API is stateless per call.

use crate::checksum::build_url;
use crate::error::{ConferenceApiError, Result};
use crate::xml::{self, CreateMeetingResponse, EndMeetingResponse, MeetingInfoResponse};
use common::secret::SecretString;
use tracing::{debug, instrument, warn};

/// Outcome of a `start_meeting` call, mirroring the three cases the
/// orchestration loop must branch on (§5.2 start logic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The create call failed or the server rejected it outright.
    Failed,
    /// The meeting is running and at least one participant has joined.
    UsersJoined,
    /// The meeting is running (or already was, via `duplicateWarning`) but
    /// nobody has joined yet; the caller should keep polling.
    KeepOpen,
}

/// Parameters accepted by `createMeeting`, all optional except the meeting
/// id. Unset fields are simply omitted from the signed query string rather
/// than sent with a default value, matching BBB's own defaulting.
#[derive(Debug, Clone, Default)]
pub struct CreateMeetingParams<'a> {
    pub name: Option<&'a str>,
    pub moderator_pw: Option<&'a str>,
    pub attendee_pw: Option<&'a str>,
    pub mute_on_start: Option<bool>,
    pub welcome: Option<&'a str>,
    pub banner_text: Option<&'a str>,
    pub max_participants: Option<u32>,
    pub logout_url: Option<&'a str>,
    pub record: Option<bool>,
    pub duration: Option<u32>,
    pub auto_start_recording: Option<bool>,
    pub allow_start_stop_recording: Option<bool>,
}

impl<'a> CreateMeetingParams<'a> {
    fn into_query_params(self, meeting_id: &'a str) -> Vec<(&'a str, String)> {
        let mut params = vec![("meetingID", meeting_id.to_string())];
        if let Some(name) = self.name {
            params.push(("name", name.to_string()));
        }
        if let Some(pw) = self.moderator_pw {
            params.push(("moderatorPW", pw.to_string()));
        }
        if let Some(pw) = self.attendee_pw {
            params.push(("attendeePW", pw.to_string()));
        }
        if let Some(mute) = self.mute_on_start {
            params.push(("muteOnStart", mute.to_string()));
        }
        if let Some(welcome) = self.welcome {
            params.push(("welcome", welcome.to_string()));
        }
        if let Some(banner) = self.banner_text {
            params.push(("bannerText", banner.to_string()));
        }
        if let Some(max) = self.max_participants {
            params.push(("maxParticipants", max.to_string()));
        }
        if let Some(logout_host) = self.logout_url {
            params.push(("logoutURL", format!("https://{logout_host}")));
        }
        if let Some(record) = self.record {
            params.push(("record", record.to_string()));
        }
        if let Some(duration) = self.duration {
            params.push(("duration", duration.to_string()));
        }
        if let Some(auto) = self.auto_start_recording {
            params.push(("autoStartRecording", auto.to_string()));
        }
        if let Some(allow) = self.allow_start_stop_recording {
            params.push(("allowStartStopRecording", allow.to_string()));
        }
        params
    }
}

/// A conference server's meeting-ID/role-based join password resolution,
/// used by [`ConferenceApiClient::join_url`] when the caller doesn't supply
/// one directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRole {
    Moderator,
    Attendee,
}

impl JoinRole {
    fn as_str(self) -> &'static str {
        match self {
            JoinRole::Moderator => "moderator",
            JoinRole::Attendee => "attendee",
        }
    }
}

/// Client bound to one conference server's base URL and shared secret.
#[derive(Clone)]
pub struct ConferenceApiClient {
    http: reqwest::Client,
    base_url: String,
    secret: SecretString,
}

impl ConferenceApiClient {
    /// Build a client for the server at `base_url`, signing with `secret`.
    ///
    /// This performs no network I/O itself; connectivity is only proven by
    /// the first real call, same as the original adapter's lazy connect.
    #[must_use]
    pub fn new(base_url: impl Into<String>, secret: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            secret,
        }
    }

    async fn get(&self, api_call: &str, params: &[(&str, String)]) -> Result<String> {
        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let url = build_url(&self.base_url, api_call, &borrowed, &self.secret);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ConferenceApiError::Request(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| ConferenceApiError::Request(e.to_string()))
    }

    /// `getMeetingInfo`. Returns `None` if the request fails or the server
    /// reports anything other than `SUCCESS`, matching the original's
    /// "any exception collapses to no info" behavior.
    #[instrument(skip(self), fields(%meeting_id))]
    pub async fn meeting_info(&self, meeting_id: &str) -> Option<MeetingInfoResponse> {
        let params = [("meetingID", meeting_id.to_string())];
        let body = match self.get("getMeetingInfo", &params).await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "conference_api.client", %err, "getMeetingInfo request failed");
                return None;
            }
        };
        match xml::parse::<MeetingInfoResponse>(&body) {
            Ok(info) if info.envelope.is_success() => Some(info),
            Ok(_) => None,
            Err(err) => {
                warn!(target: "conference_api.client", %err, "getMeetingInfo response malformed");
                None
            }
        }
    }

    /// `create`. Mirrors the three-way branch the orchestration loop needs:
    /// failure, running-with-joiners, or running-and-still-empty.
    #[instrument(skip(self, params), fields(%meeting_id))]
    pub async fn create_meeting(
        &self,
        meeting_id: &str,
        params: CreateMeetingParams<'_>,
    ) -> StartOutcome {
        let query = params.into_query_params(meeting_id);
        let body = match self.get("create", &query).await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "conference_api.client", %err, "create request failed");
                return StartOutcome::Failed;
            }
        };
        let parsed = match xml::parse::<CreateMeetingResponse>(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(target: "conference_api.client", %err, "create response malformed");
                return StartOutcome::Failed;
            }
        };
        if !parsed.envelope.is_success() {
            debug!(target: "conference_api.client", "failed to start meeting");
            return StartOutcome::Failed;
        }
        if parsed.envelope.is_duplicate_warning() {
            debug!(target: "conference_api.client", "meeting already running");
        }
        if parsed.has_user_joined == Some(false) {
            debug!(target: "conference_api.client", "no users have joined yet, keeping open");
            return StartOutcome::KeepOpen;
        }
        debug!(target: "conference_api.client", "users have joined, stopping to process");
        StartOutcome::UsersJoined
    }

    /// `end`. Looks up the meeting's moderator password first (the server
    /// won't accept `end` without it), then sends the end request.
    #[instrument(skip(self), fields(%meeting_id))]
    pub async fn end_meeting(&self, meeting_id: &str) -> bool {
        let Some(info) = self.meeting_info(meeting_id).await else {
            return false;
        };
        let Some(moderator_pw) = info.moderator_pw else {
            return false;
        };
        let params = [
            ("meetingID", meeting_id.to_string()),
            ("password", moderator_pw),
        ];
        let body = match self.get("end", &params).await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "conference_api.client", %err, "end request failed");
                return false;
            }
        };
        match xml::parse::<EndMeetingResponse>(&body) {
            Ok(parsed) => parsed.request_accepted(),
            Err(err) => {
                warn!(target: "conference_api.client", %err, "end response malformed");
                false
            }
        }
    }

    /// `getMeetings`. Returns an empty list on any failure rather than
    /// propagating an error, since callers treat "no meetings" and
    /// "couldn't ask" identically (§4.3).
    #[instrument(skip(self))]
    pub async fn get_meetings(&self) -> Vec<xml::MeetingSummary> {
        let body = match self.get("getMeetings", &[]).await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: "conference_api.client", %err, "getMeetings request failed");
                return Vec::new();
            }
        };
        match xml::parse::<xml::GetMeetingsResponse>(&body) {
            Ok(parsed) if parsed.envelope.is_success() => parsed.meetings().to_vec(),
            Ok(_) => {
                warn!(target: "conference_api.client", "getMeetings request failed");
                Vec::new()
            }
            Err(err) => {
                warn!(target: "conference_api.client", %err, "getMeetings response malformed");
                Vec::new()
            }
        }
    }

    /// Build a signed join URL for `meeting_id` under the given display
    /// `name` and `role`. If `pw` isn't supplied, the meeting's current
    /// moderator/attendee password is looked up via `getMeetingInfo`;
    /// returns `None` if no password can be resolved either way.
    #[instrument(skip(self), fields(%meeting_id, %name))]
    pub async fn join_url(
        &self,
        meeting_id: &str,
        name: &str,
        role: JoinRole,
        pw: Option<&str>,
    ) -> Option<String> {
        let resolved_pw = match pw {
            Some(pw) => pw.to_string(),
            None => {
                let info = self.meeting_info(meeting_id).await?;
                match role {
                    JoinRole::Moderator => info.moderator_pw?,
                    JoinRole::Attendee => info.attendee_pw?,
                }
            }
        };
        let params = [
            ("fullName", name.to_string()),
            ("meetingID", meeting_id.to_string()),
            ("password", resolved_pw),
            ("role", role.as_str().to_string()),
        ];
        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Some(build_url(&self.base_url, "join", &borrowed, &self.secret))
    }
}
