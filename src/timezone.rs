//! Local-day resolution
//!
//! Every daily bucket in the pipeline is a calendar day in the user's local
//! timezone. `LocalZone` makes that timezone explicit: either the host's zone
//! (what the export tool's own dashboard assumes) or a fixed UTC offset.

use crate::error::ComputeError;
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timezone used to map sample instants onto calendar days and clock hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LocalZone {
    /// The host's local timezone
    #[default]
    System,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

impl LocalZone {
    /// UTC as a fixed zone
    pub fn utc() -> Self {
        LocalZone::Fixed(Utc.fix())
    }

    /// Parse `"local"`, `"UTC"`/`"Z"`, or an offset such as `"+05:30"` / `"-0800"`.
    pub fn parse(raw: &str) -> Result<Self, ComputeError> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "local" | "system" => return Ok(LocalZone::System),
            "utc" | "z" | "gmt" => return Ok(LocalZone::utc()),
            _ => {}
        }
        parse_offset(trimmed)
            .map(LocalZone::Fixed)
            .ok_or_else(|| ComputeError::InvalidTimezone(raw.to_string()))
    }

    /// Wall-clock time of `ts` in this zone
    pub fn localize(&self, ts: &DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            LocalZone::System => ts.with_timezone(&Local).naive_local(),
            LocalZone::Fixed(offset) => ts.with_timezone(offset).naive_local(),
        }
    }

    /// Calendar day of `ts` in this zone
    pub fn date_of(&self, ts: &DateTime<FixedOffset>) -> NaiveDate {
        self.localize(ts).date()
    }

    /// Clock hour (0-23) of `ts` in this zone
    pub fn hour_of(&self, ts: &DateTime<FixedOffset>) -> u32 {
        self.localize(ts).hour()
    }

    /// Attach this zone to a wall-clock time. Returns None for times skipped
    /// by a DST transition.
    pub fn localize_naive(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            LocalZone::System => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            LocalZone::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        }
    }

    /// Calendar day containing `now` in this zone
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.date_of(&now.fixed_offset())
    }
}

impl fmt::Display for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalZone::System => f.write_str("local"),
            LocalZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl TryFrom<String> for LocalZone {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LocalZone::parse(&value)
    }
}

impl From<LocalZone> for String {
    fn from(zone: LocalZone) -> Self {
        zone.to_string()
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse a sample timestamp.
///
/// Accepted forms, in order: RFC 3339, the exporter's
/// `YYYY-MM-DD HH:MM:SS ±HHMM`, and naive `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`, which are read as wall-clock times
/// in `zone`.
pub fn parse_timestamp(raw: &str, zone: &LocalZone) -> Result<DateTime<FixedOffset>, ComputeError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(ts);
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| ComputeError::DateParseError(raw.to_string()))?;

    zone.localize_naive(naive)
        .ok_or_else(|| ComputeError::DateParseError(format!("{raw} does not exist in {zone}")))
}
