//! Timestamp parsing for GOES filenames and client requests.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

/// Parse a GOES scan timestamp: `YYYYDDDHHMMSSt` (day of year, tenths of a second).
///
/// A leading `s`, `e` or `c` (as used in ABI filenames) is accepted. The
/// tenths digit is optional.
pub fn parse_abi_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let digits = s.trim_start_matches(['s', 'e', 'c']);
    let bad = || TimeParseError::InvalidFormat(s.to_string());

    if !(13..=14).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }

    let field = |range: std::ops::Range<usize>| -> Result<u32, TimeParseError> {
        digits[range].parse().map_err(|_| bad())
    };

    let year = field(0..4)? as i32;
    let doy = field(4..7)?;
    let hour = field(7..9)?;
    let minute = field(9..11)?;
    let second = field(11..13)?;
    let tenths = if digits.len() == 14 { field(13..14)? } else { 0 };

    let date = NaiveDate::from_yo_opt(year, doy).ok_or_else(bad)?;
    let naive = date.and_hms_opt(hour, minute, second).ok_or_else(bad)?;

    Ok(Utc.from_utc_datetime(&naive) + Duration::milliseconds(i64::from(tenths) * 100))
}

/// Parse a historic request reference: `YYYY-MM-DD_HHMMSS`.
///
/// RFC 3339 is accepted as well.
pub fn parse_request_time(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d_%H%M%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_abi_timestamp() {
        // Day 108 of 2025 is April 18
        let dt = parse_abi_timestamp("s20251082212150").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 4, 18));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (22, 12, 15));
    }

    #[test]
    fn test_parse_abi_timestamp_tenths() {
        let dt = parse_abi_timestamp("20250951230007").unwrap();
        assert_eq!(dt.second(), 0);
        assert_eq!(dt.timestamp_subsec_millis(), 700);
    }

    #[test]
    fn test_parse_abi_timestamp_rejects_garbage() {
        assert!(parse_abi_timestamp("s2025").is_err());
        assert!(parse_abi_timestamp("s2025999123000").is_err());
        assert!(parse_abi_timestamp("sABCDEFGHIJKLMN").is_err());
    }

    #[test]
    fn test_parse_request_time() {
        let dt = parse_request_time("2025-04-18_221215").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 4, 18, 22, 12, 15).unwrap());

        let dt = parse_request_time("2025-04-18T22:12:15Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 4, 18, 22, 12, 15).unwrap());

        assert!(parse_request_time("yesterday").is_err());
    }
}
