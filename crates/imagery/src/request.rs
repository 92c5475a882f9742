//! Client request addressing.
//!
//! A request names a reference moment, not an artifact: `live` means "now",
//! a historic token `YYYY-MM-DD_HHMMSS` means "the newest scan at or before
//! then". Both resolve to a concrete acquisition, and the artifact is keyed
//! by that acquisition's scan start alone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use imagery_common::{parse_request_time, TimeParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRequest {
    Live,
    At(DateTime<Utc>),
}

impl ImageRequest {
    pub fn reference_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ImageRequest::Live => now,
            ImageRequest::At(t) => *t,
        }
    }
}

impl FromStr for ImageRequest {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("live") || s.eq_ignore_ascii_case("latest") {
            return Ok(ImageRequest::Live);
        }
        parse_request_time(s).map(ImageRequest::At)
    }
}

impl fmt::Display for ImageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRequest::Live => f.write_str("live"),
            ImageRequest::At(t) => write!(f, "{}", t.format("%Y-%m-%d_%H%M%S")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_live() {
        assert_eq!("live".parse::<ImageRequest>().unwrap(), ImageRequest::Live);
        assert_eq!("LIVE".parse::<ImageRequest>().unwrap(), ImageRequest::Live);
    }

    #[test]
    fn test_parse_historic() {
        let req: ImageRequest = "2025-04-05_123000".parse().unwrap();
        let t = Utc.with_ymd_and_hms(2025, 4, 5, 12, 30, 0).unwrap();
        assert_eq!(req, ImageRequest::At(t));
        assert_eq!(req.to_string(), "2025-04-05_123000");
        assert_eq!(req.reference_time(Utc::now()), t);
    }

    #[test]
    fn test_parse_garbage() {
        assert!("tomorrow".parse::<ImageRequest>().is_err());
    }
}
