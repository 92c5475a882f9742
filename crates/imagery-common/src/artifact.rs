//! Canonical display artifact names.
//!
//! An artifact is addressed only by its filename:
//! `<YYYYMMDD_HHMMSS>_<projection tag>.<ext>`, e.g. `20250405_123000_merc.png`.
//! The timestamp is the acquisition (scan start) time truncated to whole
//! seconds, so every run for the same acquisition derives the same name.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn for_acquisition(acquired: DateTime<Utc>, projection_tag: &str, ext: &str) -> Self {
        Self(format!(
            "{}_{}.{}",
            acquired.format(TIMESTAMP_FORMAT),
            projection_tag,
            ext
        ))
    }

    /// Validate a filename against the naming convention.
    ///
    /// Rejects anything containing path separators, so a parsed name is
    /// always safe to join onto the artifacts directory.
    pub fn parse(name: &str) -> Option<Self> {
        if !name.is_ascii() || name.contains(['/', '\\']) || name.len() <= TIMESTAMP_LEN + 1 {
            return None;
        }
        let (stamp, rest) = name.split_at(TIMESTAMP_LEN);
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;

        let rest = rest.strip_prefix('_')?;
        let (tag, ext) = rest.rsplit_once('.')?;
        let is_token = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric());
        if !is_token(tag) || !is_token(ext) {
            return None;
        }
        Some(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without extension, used for per-run scratch directories.
    pub fn stem(&self) -> &str {
        self.0.rsplit_once('.').map_or(&self.0, |(stem, _)| stem)
    }

    /// Acquisition time encoded in the name.
    pub fn acquired(&self) -> Option<DateTime<Utc>> {
        let stamp = self.0.get(..TIMESTAMP_LEN)?;
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .ok()
            .map(|ndt| Utc.from_utc_datetime(&ndt))
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_name_for_acquisition() {
        let t = Utc.with_ymd_and_hms(2025, 4, 5, 12, 30, 0).unwrap();
        let name = ArtifactName::for_acquisition(t, "merc", "png");
        assert_eq!(name.as_str(), "20250405_123000_merc.png");
        assert_eq!(name.stem(), "20250405_123000_merc");
        assert_eq!(name.acquired(), Some(t));
    }

    #[test]
    fn test_subsecond_truncated() {
        let t = Utc.with_ymd_and_hms(2025, 4, 5, 12, 30, 0).unwrap();
        let a = ArtifactName::for_acquisition(t, "merc", "png");
        let b = ArtifactName::for_acquisition(t + Duration::milliseconds(700), "merc", "png");
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse() {
        assert!(ArtifactName::parse("20250405_123000_merc.png").is_some());
        assert!(ArtifactName::parse("20250405_123000_merc").is_none());
        assert!(ArtifactName::parse("20251305_123000_merc.png").is_none());
        assert!(ArtifactName::parse("../20250405_123000_merc.png").is_none());
        assert!(ArtifactName::parse("20250405_123000_me/rc.png").is_none());
        assert!(ArtifactName::parse("20250405_123000_.png").is_none());
    }
}
