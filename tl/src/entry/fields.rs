//! Field parsers
//!
//! Each parser turns the user's (or the model's) raw text for one field into
//! a normalized value, or a [`FieldError`] whose message can be shown to the
//! user as-is.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Spellings of the default (Pacific) zone
const PACIFIC_ALIASES: &[&str] = &["pt", "pst", "pdt", "pacific", "pacific time"];

/// Substring to canonical location
const LOCATION_OPTIONS: &[(&str, &str)] = &[("zoom", "Zoom"), ("office", "At Office")];

/// Replies meaning "no comments"
const NO_COMMENT_REPLIES: &[&str] = &["no", "none", "skip", "n/a"];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

const HOUR_MARKERS: &[&str] = &["h", "hr", "hrs", "hour", "hours"];
const MINUTE_MARKERS: &[&str] = &["m", "min", "mins", "minute", "minutes"];

/// Validation failure for a single field value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("Unknown timezone '{0}'. Try America/Los_Angeles or UTC.")]
    UnknownTimezone(String),

    #[error("'{0}' is not a date and time I understand. Use YYYY-MM-DD HH:MM (e.g. 2025-01-15 09:30).")]
    InvalidDateTime(String),

    #[error("{time} does not exist in {zone} because the clocks skip ahead then")]
    NonexistentLocalTime { time: String, zone: String },

    #[error("'{0}' is not a duration I understand. Try 1h 30m, 90m or 1:30.")]
    InvalidDuration(String),

    #[error("Minutes must be below 60 in '{0}'. Use H:MM (e.g. 1:30).")]
    MinutesOutOfRange(String),

    #[error("Duration must be longer than zero")]
    ZeroDuration,
}

/// A duration split into hours and minutes, with minutes below 60
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationParts {
    pub hours: u32,
    pub minutes: u32,
}

impl DurationParts {
    pub fn from_minutes(total: u32) -> Self {
        Self {
            hours: total / 60,
            minutes: total % 60,
        }
    }

    pub fn total_minutes(&self) -> u32 {
        self.hours.saturating_mul(60).saturating_add(self.minutes)
    }
}

impl fmt::Display for DurationParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hours, self.minutes) {
            (0, m) => write!(f, "{}m", m),
            (h, 0) => write!(f, "{}h", h),
            (h, m) => write!(f, "{}h {}m", h, m),
        }
    }
}

/// Resolve a timezone name
///
/// Empty input, `default` and the Pacific aliases map to `default_tz`.
/// Anything else must be an IANA zone name.
pub fn parse_timezone(input: &str, default_tz: Tz) -> Result<Tz, FieldError> {
    debug!(%input, "parse_timezone: called");
    let cleaned = input.trim();
    let lowered = cleaned.to_lowercase();
    if cleaned.is_empty() || lowered == "default" || PACIFIC_ALIASES.contains(&lowered.as_str()) {
        debug!(zone = %default_tz.name(), "parse_timezone: using default zone");
        return Ok(default_tz);
    }

    cleaned
        .parse::<Tz>()
        .map_err(|_| FieldError::UnknownTimezone(cleaned.to_string()))
}

/// Parse a start time in the given zone
///
/// Local `YYYY-MM-DD HH:MM[:SS]` (space or `T`) is read as wall-clock time in
/// `tz`. A full RFC 3339 timestamp keeps its instant and is re-expressed in
/// `tz`. Ambiguous wall-clock times take the earlier instant.
pub fn parse_started_at(input: &str, tz: Tz) -> Result<DateTime<Tz>, FieldError> {
    debug!(%input, zone = %tz.name(), "parse_started_at: called");
    let cleaned = input.trim();
    if cleaned.is_empty() {
        return Err(FieldError::Empty("Start time"));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(cleaned) {
        debug!("parse_started_at: matched RFC 3339");
        return Ok(instant.with_timezone(&tz));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
        .ok_or_else(|| FieldError::InvalidDateTime(cleaned.to_string()))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| FieldError::NonexistentLocalTime {
            time: naive.format("%Y-%m-%d %H:%M").to_string(),
            zone: tz.name().to_string(),
        })
}

/// Re-read a stored start time's wall-clock time in another zone
///
/// `09:30-08:00` moved to Europe/Berlin becomes `09:30+01:00`. Returns
/// `Ok(None)` when `stored` is not an RFC 3339 timestamp.
pub fn rezone_started_at(stored: &str, tz: Tz) -> Result<Option<DateTime<Tz>>, FieldError> {
    debug!(%stored, zone = %tz.name(), "rezone_started_at: called");
    let Ok(instant) = DateTime::parse_from_rfc3339(stored.trim()) else {
        return Ok(None);
    };
    let naive = instant.naive_local();
    tz.from_local_datetime(&naive)
        .earliest()
        .map(Some)
        .ok_or_else(|| FieldError::NonexistentLocalTime {
            time: naive.format("%Y-%m-%d %H:%M").to_string(),
            zone: tz.name().to_string(),
        })
}

fn duration_token_regex() -> &'static Regex {
    static DURATION_TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    DURATION_TOKEN_RE.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*([a-z]*)").expect("duration token regex should compile")
    })
}

fn negative_number_regex() -> &'static Regex {
    static NEGATIVE_NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    NEGATIVE_NUMBER_RE.get_or_init(|| Regex::new(r"(^|[^\w])-\s*\d").expect("negative number regex should compile"))
}

fn clock_duration_regex() -> &'static Regex {
    static CLOCK_DURATION_RE: OnceLock<Regex> = OnceLock::new();
    CLOCK_DURATION_RE.get_or_init(|| Regex::new(r"^(\d+):(\d+)$").expect("clock duration regex should compile"))
}

/// Parse a duration such as `1:30`, `90m`, `1h 30m`, `1.5 hours` or `1 30`
///
/// Marked numbers (`h`, `hr`, `hours`, `m`, `min`, `minutes`) go to their
/// slot. Without markers a lone number is minutes and a pair is hours then
/// minutes. A bare number beside marked ones fills the first free slot.
pub fn parse_duration(input: &str) -> Result<DurationParts, FieldError> {
    debug!(%input, "parse_duration: called");
    let cleaned = input.trim().to_lowercase();
    if cleaned.is_empty() {
        return Err(FieldError::Empty("Duration"));
    }

    if negative_number_regex().is_match(&cleaned) {
        return Err(FieldError::InvalidDuration(input.trim().to_string()));
    }

    if cleaned.contains(':') {
        let caps = clock_duration_regex()
            .captures(&cleaned)
            .ok_or_else(|| FieldError::InvalidDuration(input.trim().to_string()))?;
        let hours: u32 = caps[1]
            .parse()
            .map_err(|_| FieldError::InvalidDuration(input.trim().to_string()))?;
        let minutes: u32 = caps[2]
            .parse()
            .map_err(|_| FieldError::InvalidDuration(input.trim().to_string()))?;
        if minutes >= 60 {
            return Err(FieldError::MinutesOutOfRange(input.trim().to_string()));
        }
        let total = hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes))
            .ok_or_else(|| FieldError::InvalidDuration(input.trim().to_string()))?;
        if total == 0 {
            return Err(FieldError::ZeroDuration);
        }
        return Ok(DurationParts::from_minutes(total));
    }

    let mut hours: Option<f64> = None;
    let mut minutes: Option<f64> = None;
    let mut bare = Vec::new();

    for caps in duration_token_regex().captures_iter(&cleaned) {
        let value: f64 = caps[1]
            .parse()
            .map_err(|_| FieldError::InvalidDuration(input.trim().to_string()))?;
        let unit = &caps[2];
        if HOUR_MARKERS.contains(&unit) {
            *hours.get_or_insert(0.0) += value;
        } else if MINUTE_MARKERS.contains(&unit) {
            *minutes.get_or_insert(0.0) += value;
        } else {
            bare.push(value);
        }
    }
    debug!(?hours, ?minutes, ?bare, "parse_duration: tokens");

    if hours.is_none() && minutes.is_none() {
        match bare.as_slice() {
            [] => return Err(FieldError::InvalidDuration(input.trim().to_string())),
            [m] => minutes = Some(*m),
            [h, m] => {
                hours = Some(*h);
                minutes = Some(*m);
            }
            _ => return Err(FieldError::InvalidDuration(input.trim().to_string())),
        }
    } else {
        for value in bare {
            if hours.is_none() {
                hours = Some(value);
            } else if minutes.is_none() {
                minutes = Some(value);
            } else {
                return Err(FieldError::InvalidDuration(input.trim().to_string()));
            }
        }
    }

    let total = hours.unwrap_or(0.0) * 60.0 + minutes.unwrap_or(0.0);
    let total = total.round();
    if total < 1.0 {
        return Err(FieldError::ZeroDuration);
    }
    if total > f64::from(u32::MAX) {
        return Err(FieldError::InvalidDuration(input.trim().to_string()));
    }

    Ok(DurationParts::from_minutes(total as u32))
}

/// Map a location onto `Zoom` or `At Office`, or keep it verbatim
pub fn parse_location(input: &str) -> Result<String, FieldError> {
    debug!(%input, "parse_location: called");
    let cleaned = input.trim();
    if cleaned.is_empty() {
        return Err(FieldError::Empty("Location"));
    }

    let lowered = cleaned.to_lowercase();
    for (key, value) in LOCATION_OPTIONS {
        if lowered.contains(*key) {
            return Ok((*value).to_string());
        }
    }
    Ok(cleaned.to_string())
}

/// Trim a free-text field; `label` names it in the error
pub fn parse_text(label: &'static str, input: &str) -> Result<String, FieldError> {
    let cleaned = input.trim();
    if cleaned.is_empty() {
        return Err(FieldError::Empty(label));
    }
    Ok(cleaned.to_string())
}

/// Optional comments; `no`, `none`, `skip` and `n/a` mean none
pub fn parse_comments(input: &str) -> Option<String> {
    let cleaned = input.trim();
    if cleaned.is_empty() || NO_COMMENT_REPLIES.contains(&cleaned.to_lowercase().as_str()) {
        return None;
    }
    Some(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Los_Angeles;
    use proptest::prelude::*;

    fn duration(input: &str) -> (u32, u32) {
        let parts = parse_duration(input).unwrap();
        (parts.hours, parts.minutes)
    }

    #[test]
    fn test_timezone_default_and_aliases() {
        for input in ["", "  ", "default", "DEFAULT", "pt", "PST", "pdt", "Pacific", "pacific time"] {
            assert_eq!(parse_timezone(input, Los_Angeles).unwrap(), Los_Angeles, "input {input:?}");
        }
    }

    #[test]
    fn test_timezone_default_follows_configuration() {
        assert_eq!(
            parse_timezone("default", chrono_tz::Europe::Berlin).unwrap(),
            chrono_tz::Europe::Berlin
        );
    }

    #[test]
    fn test_timezone_iana_names() {
        assert_eq!(parse_timezone("UTC", Los_Angeles).unwrap(), chrono_tz::UTC);
        assert_eq!(
            parse_timezone(" Europe/Berlin ", Los_Angeles).unwrap().name(),
            "Europe/Berlin"
        );
    }

    #[test]
    fn test_timezone_unknown() {
        let err = parse_timezone("Mars/Phobos", Los_Angeles).unwrap_err();
        assert_eq!(err, FieldError::UnknownTimezone("Mars/Phobos".to_string()));
        assert!(err.to_string().contains("Mars/Phobos"));
    }

    #[test]
    fn test_started_at_local_formats() {
        for input in ["2025-01-15 09:30", "2025-01-15T09:30", "2025-01-15 09:30:00", "2025-01-15T09:30:00"] {
            let dt = parse_started_at(input, Los_Angeles).unwrap();
            assert_eq!(dt.fixed_offset().to_rfc3339(), "2025-01-15T09:30:00-08:00", "input {input:?}");
        }
    }

    #[test]
    fn test_started_at_uses_zone_offset() {
        let dt = parse_started_at("2025-07-01 14:00", chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(dt.fixed_offset().to_rfc3339(), "2025-07-01T14:00:00+02:00");
    }

    #[test]
    fn test_started_at_rfc3339_is_reexpressed() {
        let dt = parse_started_at("2025-01-15T17:30:00Z", Los_Angeles).unwrap();
        assert_eq!(dt.fixed_offset().to_rfc3339(), "2025-01-15T09:30:00-08:00");
    }

    #[test]
    fn test_started_at_dst_fold_takes_earlier() {
        // 01:30 happens twice on 2025-11-02 in Los Angeles
        let dt = parse_started_at("2025-11-02 01:30", Los_Angeles).unwrap();
        assert_eq!(dt.fixed_offset().to_rfc3339(), "2025-11-02T01:30:00-07:00");
    }

    #[test]
    fn test_started_at_dst_gap_is_error() {
        // 02:30 never happens on 2025-03-09 in Los Angeles
        let err = parse_started_at("2025-03-09 02:30", Los_Angeles).unwrap_err();
        assert!(matches!(err, FieldError::NonexistentLocalTime { .. }));
    }

    #[test]
    fn test_started_at_rejects_other_formats() {
        assert!(matches!(
            parse_started_at("next tuesday", Los_Angeles),
            Err(FieldError::InvalidDateTime(_))
        ));
        assert!(matches!(
            parse_started_at("15/01/2025 09:30", Los_Angeles),
            Err(FieldError::InvalidDateTime(_))
        ));
        assert_eq!(
            parse_started_at(" ", Los_Angeles).unwrap_err(),
            FieldError::Empty("Start time")
        );
    }

    #[test]
    fn test_duration_examples() {
        assert_eq!(duration("1:30"), (1, 30));
        assert_eq!(duration("90m"), (1, 30));
        assert_eq!(duration("1h 30m"), (1, 30));
        assert_eq!(duration("1h30m"), (1, 30));
        assert_eq!(duration("2 hours"), (2, 0));
        assert_eq!(duration("45 minutes"), (0, 45));
        assert_eq!(duration("1 hr 15 mins"), (1, 15));
        assert_eq!(duration("1.5h"), (1, 30));
        assert_eq!(duration("0:45"), (0, 45));
    }

    #[test]
    fn test_duration_positional_inference() {
        assert_eq!(duration("45"), (0, 45));
        assert_eq!(duration("1 30"), (1, 30));
        assert_eq!(duration("1h 30"), (1, 30));
        assert_eq!(duration("75"), (1, 15));
    }

    #[test]
    fn test_duration_errors() {
        assert_eq!(parse_duration("").unwrap_err(), FieldError::Empty("Duration"));
        assert_eq!(parse_duration("0h 0m").unwrap_err(), FieldError::ZeroDuration);
        assert_eq!(parse_duration("0:00").unwrap_err(), FieldError::ZeroDuration);
        assert!(matches!(
            parse_duration("1:75"),
            Err(FieldError::MinutesOutOfRange(_))
        ));
        assert!(matches!(
            parse_duration("a while"),
            Err(FieldError::InvalidDuration(_))
        ));
        assert!(matches!(parse_duration("1:2:3"), Err(FieldError::InvalidDuration(_))));
        assert!(matches!(parse_duration("1 2 3"), Err(FieldError::InvalidDuration(_))));
    }

    #[test]
    fn test_duration_too_large_is_error() {
        for input in ["71582789:00", "4294967295:59"] {
            assert_eq!(
                parse_duration(input).unwrap_err(),
                FieldError::InvalidDuration(input.to_string()),
                "input {input:?}"
            );
        }
        assert_eq!(duration("71582788:00"), (71_582_788, 0));
    }

    #[test]
    fn test_duration_rejects_negative() {
        for input in ["-30", "- 30", "1h -30m", "-1:30"] {
            assert!(
                matches!(parse_duration(input), Err(FieldError::InvalidDuration(_))),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_rezone_keeps_wall_clock() {
        let moved = rezone_started_at("2025-01-15T09:30:00-08:00", chrono_tz::Europe::Berlin)
            .unwrap()
            .unwrap();
        assert_eq!(moved.fixed_offset().to_rfc3339(), "2025-01-15T09:30:00+01:00");

        assert_eq!(rezone_started_at("not a timestamp", Los_Angeles).unwrap(), None);

        // 02:30 on 2025-03-09 does not exist in Los Angeles
        let err = rezone_started_at("2025-03-09T02:30:00+00:00", Los_Angeles).unwrap_err();
        assert!(matches!(err, FieldError::NonexistentLocalTime { .. }));
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(DurationParts::from_minutes(90).to_string(), "1h 30m");
        assert_eq!(DurationParts::from_minutes(120).to_string(), "2h");
        assert_eq!(DurationParts::from_minutes(5).to_string(), "5m");
    }

    #[test]
    fn test_location() {
        assert_eq!(parse_location("i'll be in the office").unwrap(), "At Office");
        assert_eq!(parse_location("Zoom call").unwrap(), "Zoom");
        assert_eq!(parse_location("  Central Library ").unwrap(), "Central Library");
        assert_eq!(parse_location("").unwrap_err(), FieldError::Empty("Location"));
    }

    #[test]
    fn test_text() {
        assert_eq!(parse_text("Topic", "  planning ").unwrap(), "planning");
        assert_eq!(parse_text("Topic", "   ").unwrap_err().to_string(), "Topic cannot be empty");
    }

    #[test]
    fn test_comments() {
        for input in ["", "no", "None", "SKIP", "n/a", "  no  "] {
            assert_eq!(parse_comments(input), None, "input {input:?}");
        }
        assert_eq!(
            parse_comments(" billed to retainer "),
            Some("billed to retainer".to_string())
        );
    }

    proptest! {
        #[test]
        fn prop_clock_duration_matches_parts(h in 0u32..48, m in 0u32..60) {
            prop_assume!(h + m > 0);
            let parts = parse_duration(&format!("{}:{:02}", h, m)).unwrap();
            prop_assert_eq!(parts, DurationParts { hours: h, minutes: m });
        }

        #[test]
        fn prop_minutes_carry_into_hours(total in 1u32..10_000) {
            let parts = parse_duration(&format!("{}m", total)).unwrap();
            prop_assert!(parts.minutes < 60);
            prop_assert_eq!(parts.total_minutes(), total);
        }
    }
}
