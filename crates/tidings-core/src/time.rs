// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp encoding used for persisted rows and cursors.
//!
//! Timestamps are stored as fixed-width UTC text with microsecond precision,
//! so lexical order in the database equals chronological order.

use chrono::{DateTime, SubsecRound, Utc};

const STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Current time truncated to the stored precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp for storage or for a cursor.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(STORAGE_FORMAT).to_string()
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn storage_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2026, 1, 22, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(&whole), "2026-01-22T10:00:00.000000Z");
        let later = whole + chrono::Duration::microseconds(7);
        assert_eq!(format_timestamp(&later), "2026-01-22T10:00:00.000007Z");
        assert!(format_timestamp(&whole) < format_timestamp(&later));
    }

    #[test]
    fn parse_accepts_offsets() {
        let parsed = parse_timestamp("2026-01-22T12:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 22, 10, 0, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn now_survives_storage_encoding() {
        let ts = now();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }
}
