//! Timestamp normalization
//!
//! Recorders emit local wall-clock time with a UTC offset attached
//! (`2018-08-14T15:30:00-0400`). The offset is dropped and the wall-clock time
//! kept, so `hour` reflects the subject's local day.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-8601-like timestamp into naive local time
pub fn normalize_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Render a naive timestamp the way tables carry it
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_offset_is_dropped_keeping_wall_clock() {
        let ts = normalize_timestamp("2018-08-14T15:30:00-0400").unwrap();
        assert_eq!(ts.hour(), 15);
        assert_eq!(ts.minute(), 30);
    }

    #[test]
    fn test_rfc3339_forms() {
        assert_eq!(normalize_timestamp("2018-08-14T22:00:05Z").unwrap().hour(), 22);
        assert_eq!(
            normalize_timestamp("2018-08-14T01:00:00+09:00").unwrap().hour(),
            1
        );
    }

    #[test]
    fn test_naive_forms() {
        assert_eq!(normalize_timestamp("2018-08-14 07:15:00").unwrap().hour(), 7);
        assert_eq!(
            normalize_timestamp("2018-08-14T07:15:00.500").unwrap().nanosecond(),
            500_000_000
        );
        assert_eq!(normalize_timestamp("2018-08-14").unwrap().hour(), 0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(normalize_timestamp("yesterday").is_none());
        assert!(normalize_timestamp("").is_none());
    }

    #[test]
    fn test_format_roundtrips_through_normalize() {
        let ts = normalize_timestamp("2018-08-14T15:30:00-0400").unwrap();
        assert_eq!(normalize_timestamp(&format_timestamp(&ts)), Some(ts));
    }
}
