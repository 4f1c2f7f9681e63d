//! Alert history models

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One past notification for one entity of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Source (worksheet) name
    pub source: String,

    /// Row-level identifier within the source
    pub entity_id: String,

    /// When the alert was successfully dispatched
    pub notified_at: DateTime<Utc>,
}

impl AlertRecord {
    /// Create a new alert record
    pub fn new(
        source: impl Into<String>,
        entity_id: impl Into<String>,
        notified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            entity_id: entity_id.into(),
            notified_at,
        }
    }

    /// Suppression key of this record
    pub fn key(&self) -> String {
        suppression_key(&self.source, &self.entity_id)
    }
}

/// Key under which notifications for an entity are tracked
pub fn suppression_key(source: &str, entity_id: &str) -> String {
    format!("{source}:{entity_id}")
}

/// Parse a ledger timestamp.
///
/// RFC 3339 is what Sheetwatch writes. Naive ISO-8601 date-times (no offset)
/// are also accepted and interpreted in the local time zone, which is how
/// older history rows were recorded.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Format a timestamp the way the ledger stores it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let record = AlertRecord::new("LINE", "r1", Utc::now());
        assert_eq!(record.key(), "LINE:r1");
    }

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_timestamp("2024-05-01T09:30:00+09:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 0, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_uses_local_zone() {
        let ts = parse_timestamp("2024-05-01T09:30:00.123456").unwrap();
        let expected = Local
            .with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(ts.timestamp(), expected.timestamp());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-01T00:00:00").is_none());
    }

    #[test]
    fn test_format_roundtrips_through_parse() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&now)), Some(now));
    }
}
