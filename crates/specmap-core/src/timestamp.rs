use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parse the timestamp shapes found in project files: RFC 3339, a naive
/// ISO datetime (`2025-03-01T10:00:00.123456`, read as UTC) or a bare date
/// (midnight UTC).
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` for a required timestamp.
pub fn lenient<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

/// `deserialize_with` for an optional timestamp. `null` and `""` are `None`.
pub fn lenient_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse("2025-03-01T12:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn parses_naive_isoformat() {
        let dt = parse("2025-03-01T10:00:00.123456").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.nanosecond(), 123_456_000);
        assert!(parse("2025-03-01T10:00:00").is_some());
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let dt = parse("2025-03-01").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("last tuesday").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn optional_accepts_null_and_empty() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "lenient_option")]
            at: Option<DateTime<Utc>>,
        }
        let r: Row = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(r.at.is_none());
        let r: Row = serde_json::from_str(r#"{"at": ""}"#).unwrap();
        assert!(r.at.is_none());
        let r: Row = serde_json::from_str("{}").unwrap();
        assert!(r.at.is_none());
        let r: Row = serde_json::from_str(r#"{"at": "2025-03-01"}"#).unwrap();
        assert!(r.at.is_some());
    }
}
