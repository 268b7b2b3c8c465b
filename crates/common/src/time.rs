//! Wall-clock sampling and the ledger's timestamp format.
//!
//! Every status-ledger entry is stamped with the wall-clock time the tick
//! started, not the time each individual stage ran — a multi-hour tick would
//! otherwise record inconsistent timestamps across a single pass over a
//! meeting's sub-statuses. Callers should sample [`Clock::now`] once per
//! tick and thread the result through every stage that writes to the ledger.

use chrono::{DateTime, Local, NaiveDateTime};

/// Format used for every status-ledger timestamp, matching the format the
/// Python implementation parsed and produced (`"%Y-%m-%d %H:%M"`).
pub const LEDGER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A source of wall-clock time, sampled once per orchestration tick.
///
/// Production code uses [`Clock::system`]; tests can construct a `Clock`
/// around a fixed instant to make minute-boundary arithmetic deterministic.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    now: DateTime<Local>,
}

impl Clock {
    /// Sample the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self { now: Local::now() }
    }

    /// Build a clock around a fixed point in time (for tests).
    #[must_use]
    pub fn at(now: DateTime<Local>) -> Self {
        Self { now }
    }

    /// The sampled time.
    #[must_use]
    pub fn now(&self) -> DateTime<Local> {
        self.now
    }

    /// Render the sampled time in the ledger's timestamp format.
    #[must_use]
    pub fn format_for_ledger(&self) -> String {
        self.now.format(LEDGER_TIMESTAMP_FORMAT).to_string()
    }
}

/// Parse a `startDate`/`endDate`-style field in the ledger's timestamp format.
///
/// Returns `None` if the string does not match `"%Y-%m-%d %H:%M"`, mirroring
/// the permissive "skip this meeting" behavior the processor takes when a
/// date field is malformed rather than failing the whole tick.
#[must_use]
pub fn parse_ledger_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, LEDGER_TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_round_trips_through_parse() {
        let now = Local.with_ymd_and_hms(2026, 7, 28, 14, 30, 0).unwrap();
        let clock = Clock::at(now);
        let rendered = clock.format_for_ledger();

        assert_eq!(rendered, "2026-07-28 14:30");
        assert!(parse_ledger_timestamp(&rendered).is_some());
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(parse_ledger_timestamp("not a date").is_none());
        assert!(parse_ledger_timestamp("2026-07-28").is_none());
    }
}
