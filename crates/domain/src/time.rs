//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDateTime, Utc};

/// UTC timestamp used for `last_updated`, schedule windows, etc.
pub type Timestamp = DateTime<Utc>;

/// Format used by the legacy JSON files for `last_updated`.
pub const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp the way the legacy files store it.
#[must_use]
pub fn to_legacy(ts: Timestamp) -> String {
    ts.format(LEGACY_FORMAT).to_string()
}

/// Parse either an RFC 3339 timestamp or the legacy `%Y-%m-%d %H:%M:%S` form
/// (interpreted as UTC).
#[must_use]
pub fn parse_flexible(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.to_utc());
    }
    NaiveDateTime::parse_from_str(value, LEGACY_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_parse_legacy_format_as_utc() {
        let ts = parse_flexible("2024-11-02 18:30:05").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 11, 2, 18, 30, 5).unwrap());
    }

    #[test]
    fn should_parse_rfc3339_with_offset() {
        let ts = parse_flexible("2024-11-02T20:30:05+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 11, 2, 18, 30, 5).unwrap());
    }

    #[test]
    fn should_reject_garbage() {
        assert!(parse_flexible("yesterday").is_none());
    }

    #[test]
    fn should_render_legacy_format() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 9, 7, 5, 0).unwrap();
        assert_eq!(to_legacy(ts), "2025-01-09 07:05:00");
    }
}
