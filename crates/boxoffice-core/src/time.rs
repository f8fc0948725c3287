use crate::error::{CoreError, Result};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

pub use time::OffsetDateTime as Timestamp;

/// Default confirmation timestamp for records that were never confirmed.
pub const EPOCH: OffsetDateTime = OffsetDateTime::UNIX_EPOCH;

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Parses an ISO-8601 timestamp.
///
/// RFC 3339 values keep their offset. A value without an offset
/// (`2024-01-01T00:00:00` or with fractional seconds) is read as UTC.
pub fn parse_timestamp(value: &str) -> Result<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(parsed);
    }

    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let naive_fraction =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

    PrimitiveDateTime::parse(value, &naive)
        .or_else(|_| PrimitiveDateTime::parse(value, &naive_fraction))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| CoreError::invalid_timestamp(format!("'{value}': {e}")))
}

pub fn format_timestamp(value: &OffsetDateTime) -> Result<String> {
    value
        .format(&Rfc3339)
        .map_err(|e| CoreError::invalid_timestamp(e.to_string()))
}

/// Serde adapter for RFC 3339 timestamp fields.
pub mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = super::format_timestamp(value).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_rfc3339_utc() {
        let parsed = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(parsed, datetime!(2024-01-01 00:00:00 UTC));
    }

    #[test]
    fn test_parse_rfc3339_keeps_offset() {
        let parsed = parse_timestamp("2024-06-01T18:30:00+02:00").unwrap();
        assert_eq!(parsed, datetime!(2024-06-01 16:30:00 UTC));
        assert_eq!(format_timestamp(&parsed).unwrap(), "2024-06-01T18:30:00+02:00");
    }

    #[test]
    fn test_parse_naive_as_utc() {
        let parsed = parse_timestamp("2024-03-05T10:11:12").unwrap();
        assert_eq!(parsed, datetime!(2024-03-05 10:11:12 UTC));

        let fractional = parse_timestamp("2024-03-05T10:11:12.250").unwrap();
        assert_eq!(fractional, datetime!(2024-03-05 10:11:12.25 UTC));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_timestamp("not-a-date").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimestamp(_)));
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_epoch_formats() {
        assert_eq!(format_timestamp(&EPOCH).unwrap(), "1970-01-01T00:00:00Z");
    }
}
