//! Date/time utilities for gator.
//!
//! Timestamps are stored as fixed-width UTC text so that SQL `ORDER BY`
//! on the column matches chronological order.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for timestamps (always 26 characters).
const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format a timestamp for storage.
pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Accepts the storage format, plain SQLite `datetime('now')` output and RFC 3339.
pub fn from_storage(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, STORAGE_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_storage_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let fraction = whole + chrono::Duration::microseconds(120);
        assert_eq!(to_storage(&whole), "2024-01-02 03:04:05.000000");
        assert_eq!(to_storage(&fraction), "2024-01-02 03:04:05.000120");
        assert!(to_storage(&whole) < to_storage(&fraction));
    }

    #[test]
    fn test_from_storage_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(from_storage(&to_storage(&dt)), Some(dt));
    }

    #[test]
    fn test_from_storage_other_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(from_storage("2024-05-06 07:08:09"), Some(expected));
        assert_eq!(from_storage("2024-05-06T07:08:09Z"), Some(expected));
        assert_eq!(from_storage("garbage"), None);
    }
}
