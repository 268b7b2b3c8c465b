//! BBB's XML response envelopes (§4.3).
//!
//! `returncode == "SUCCESS"` is the only success signal; everything else
//! (including a missing `returncode`) is a failure. `messageKey ==
//! "duplicateWarning"` on an otherwise-successful `create` is surfaced
//! separately rather than treated as a failure.

use serde::Deserialize;

/// The common envelope fields present on every BBB response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub returncode: String,
    #[serde(rename = "messageKey", default)]
    pub message_key: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.returncode == "SUCCESS"
    }

    #[must_use]
    pub fn is_duplicate_warning(&self) -> bool {
        self.message_key.as_deref() == Some("duplicateWarning")
    }
}

/// Response to `create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetingResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(rename = "meetingID", default)]
    pub meeting_id: Option<String>,
    #[serde(rename = "hasUserJoined", default)]
    pub has_user_joined: Option<bool>,
}

/// Response to `end`.
#[derive(Debug, Clone, Deserialize)]
pub struct EndMeetingResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl EndMeetingResponse {
    /// BBB's confirmation that an end request was accepted
    /// (`messageKey == "sentEndMeetingRequest"`), not that the meeting has
    /// actually stopped yet.
    #[must_use]
    pub fn request_accepted(&self) -> bool {
        self.envelope.is_success()
            && self.envelope.message_key.as_deref() == Some("sentEndMeetingRequest")
    }
}

/// Response to `getMeetingInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingInfoResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(rename = "meetingID", default)]
    pub meeting_id: Option<String>,
    #[serde(rename = "moderatorPW", default)]
    pub moderator_pw: Option<String>,
    #[serde(rename = "attendeePW", default)]
    pub attendee_pw: Option<String>,
    #[serde(rename = "meetingName", default)]
    pub meeting_name: Option<String>,
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(rename = "participantCount", default)]
    pub participant_count: Option<u32>,
}

/// A single `<meeting>` entry inside `getMeetings`'s `<meetings>` list.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingSummary {
    #[serde(rename = "meetingID")]
    pub meeting_id: String,
    #[serde(rename = "meetingName", default)]
    pub meeting_name: Option<String>,
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(rename = "participantCount", default)]
    pub participant_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct MeetingsList {
    #[serde(rename = "meeting", default)]
    meeting: Vec<MeetingSummary>,
}

/// Response to `getMeetings`.
///
/// BBB serializes a single-meeting result as one `<meeting>` element, not a
/// list, so [`GetMeetingsResponse::meetings`] normalizes both shapes into a
/// single `Vec` (§4.3: "normalizes a single-item response to a one-element
/// sequence").
#[derive(Debug, Clone, Deserialize)]
pub struct GetMeetingsResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(rename = "meetings", default)]
    meetings: Option<MeetingsList>,
}

impl GetMeetingsResponse {
    #[must_use]
    pub fn meetings(&self) -> &[MeetingSummary] {
        self.meetings
            .as_ref()
            .map_or(&[], |list| list.meeting.as_slice())
    }
}

/// Parse a BBB XML response body as `T`.
///
/// # Errors
///
/// Returns the underlying `quick_xml` error as a string if the body is not
/// well-formed XML, or does not match the expected shape.
pub fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, String> {
    quick_xml::de::from_str(body).map_err(|e| e.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_successful_create_response() {
        let xml = "<response><returncode>SUCCESS</returncode><meetingID>room-1</meetingID><hasUserJoined>false</hasUserJoined></response>";
        let parsed: CreateMeetingResponse = parse(xml).expect("parses");
        assert!(parsed.envelope.is_success());
        assert_eq!(parsed.meeting_id.as_deref(), Some("room-1"));
        assert_eq!(parsed.has_user_joined, Some(false));
    }

    #[test]
    fn detects_duplicate_warning() {
        let xml = "<response><returncode>SUCCESS</returncode><messageKey>duplicateWarning</messageKey><message>already running</message></response>";
        let parsed: CreateMeetingResponse = parse(xml).expect("parses");
        assert!(parsed.envelope.is_success());
        assert!(parsed.envelope.is_duplicate_warning());
    }

    #[test]
    fn end_meeting_requires_exact_message_key() {
        let xml = "<response><returncode>SUCCESS</returncode><messageKey>sentEndMeetingRequest</messageKey><message>ok</message></response>";
        let parsed: EndMeetingResponse = parse(xml).expect("parses");
        assert!(parsed.request_accepted());
    }

    #[test]
    fn get_meetings_normalizes_single_meeting() {
        let xml = "<response><returncode>SUCCESS</returncode><meetings><meeting><meetingID>m1</meetingID><running>true</running></meeting></meetings></response>";
        let parsed: GetMeetingsResponse = parse(xml).expect("parses");
        assert_eq!(parsed.meetings().len(), 1);
        assert_eq!(parsed.meetings()[0].meeting_id, "m1");
    }

    #[test]
    fn get_meetings_handles_empty_list() {
        let xml = "<response><returncode>SUCCESS</returncode><messageKey>noMeetings</messageKey></response>";
        let parsed: GetMeetingsResponse = parse(xml).expect("parses");
        assert!(parsed.meetings().is_empty());
    }

    #[test]
    fn failure_is_not_success() {
        let xml = "<response><returncode>FAILED</returncode><messageKey>notFound</messageKey><message>not found</message></response>";
        let parsed: Envelope = parse(xml).expect("parses");
        assert!(!parsed.is_success());
    }
}
