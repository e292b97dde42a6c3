//! Date/time parsing utilities
//!
//! This module parses user-supplied dates (ISO 8601 or relative durations)
//! and the timestamps the balancer returns, which may or may not carry an
//! explicit offset.

use crate::error::{Result, VaultKrateError};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Parse a date string in various formats:
/// - ISO 8601 dates: "2024-12-31", "2024-12-31T23:59:59", "2024-12-31T23:59:59Z"
/// - Relative durations: "30d", "7d", "3h", "30min", "1w"
pub fn parse_datetime_or_duration(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(datetime) = parse_relative_duration(input, now) {
        return Ok(datetime);
    }

    parse_iso_datetime(input)
}

/// Parse relative durations like "30d", "3h", "45min", "2w"
pub fn parse_relative_duration(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let re = Regex::new(r"^(\d+)(w|d|h|min|m)$")?;

    let captures = re.captures(input).ok_or_else(|| {
        VaultKrateError::invalid_argument(format!(
            "Invalid relative duration format: '{}'. Expected format like '3h', '2d', '1w', '30min'",
            input
        ))
    })?;

    let value: i64 = captures[1].parse().map_err(|_| {
        VaultKrateError::invalid_argument(format!("Invalid number in duration: {}", &captures[1]))
    })?;

    let offset = match &captures[2] {
        "w" => Duration::try_weeks(value),
        "d" => Duration::try_days(value),
        "h" => Duration::try_hours(value),
        "min" | "m" => Duration::try_minutes(value),
        unit => {
            return Err(VaultKrateError::invalid_argument(format!(
                "Unknown duration unit: {}",
                unit
            )))
        }
    };

    offset
        .and_then(|offset| now.checked_add_signed(offset))
        .ok_or_else(|| {
            VaultKrateError::invalid_argument(format!("Duration out of range: '{}'", input))
        })
}

/// Parse ISO 8601 date/datetime strings; values without an offset are UTC
pub fn parse_iso_datetime(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
            return Ok(naive.and_utc());
        }
    }

    // Date only: end of that day
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(23, 59, 59) {
            return Ok(naive.and_utc());
        }
    }

    Err(VaultKrateError::invalid_argument(format!(
        "Invalid date format: '{}'. Expected ISO 8601 (YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS, YYYY-MM-DDTHH:MM:SSZ) or a relative duration (3h, 2d, 1w)",
        input
    )))
}

/// Whether `at` lies before `now`
pub fn is_expired(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match at {
        Some(at) => at < now,
        None => false,
    }
}

/// Whole hours from `now` until `at`, rounded down
pub fn hours_until(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (at - now).num_hours()
}

/// Serde support for balancer timestamps, with or without an offset
pub mod flexible {
    use super::parse_iso_datetime;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_iso_datetime(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::super::parse_iso_datetime;
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw {
                Some(value) if !value.trim().is_empty() => parse_iso_datetime(&value)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_relative_duration() {
        assert_eq!(
            parse_relative_duration("3h", now()).unwrap(),
            now() + Duration::hours(3)
        );
        assert_eq!(
            parse_relative_duration("2d", now()).unwrap(),
            now() + Duration::days(2)
        );
        assert_eq!(
            parse_relative_duration("30min", now()).unwrap(),
            now() + Duration::minutes(30)
        );
        assert_eq!(
            parse_relative_duration("1w", now()).unwrap(),
            now() + Duration::weeks(1)
        );
        assert!(parse_relative_duration("soon", now()).is_err());
    }

    #[test]
    fn test_out_of_range_duration_is_an_error() {
        for input in ["3000000000h", "99999999999999w", "99999999999999999999d"] {
            assert!(
                matches!(
                    parse_relative_duration(input, now()),
                    Err(VaultKrateError::InvalidArgument(_))
                ),
                "{input}"
            );
            assert!(parse_datetime_or_duration(input, now()).is_err(), "{input}");
        }
    }

    #[test]
    fn test_parse_iso_datetime() {
        let result = parse_iso_datetime("2024-12-31").unwrap();
        assert_eq!(result.date_naive().to_string(), "2024-12-31");
        assert_eq!(result.hour(), 23);

        let result = parse_iso_datetime("2024-12-31T10:30:00Z").unwrap();
        assert_eq!(result.month(), 12);
        assert_eq!(result.hour(), 10);

        let result = parse_iso_datetime("2024-12-31T10:30:00+02:00").unwrap();
        assert_eq!(result.hour(), 8);

        let result = parse_iso_datetime("2024-12-31T10:30:00.123456").unwrap();
        assert_eq!(result.minute(), 30);

        let result = parse_iso_datetime("2024-12-31T10:30").unwrap();
        assert_eq!(result.year(), 2024);

        assert!(parse_iso_datetime("31/12/2024").is_err());
    }

    #[test]
    fn test_datetime_or_duration() {
        assert_eq!(
            parse_datetime_or_duration(" 7d ", now()).unwrap(),
            now() + Duration::days(7)
        );
        assert_eq!(
            parse_datetime_or_duration("2024-06-02T00:00:00Z", now())
                .unwrap()
                .day(),
            2
        );
        assert!(parse_datetime_or_duration("invalid", now()).is_err());
    }

    #[test]
    fn test_is_expired_and_hours_until() {
        assert!(is_expired(Some(now() - Duration::seconds(1)), now()));
        assert!(!is_expired(Some(now() + Duration::hours(1)), now()));
        assert!(!is_expired(None, now()));

        assert_eq!(hours_until(now() + Duration::minutes(150), now()), 2);
        assert_eq!(hours_until(now() + Duration::minutes(59), now()), 0);
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Stamped {
        #[serde(with = "flexible")]
        at: DateTime<Utc>,
        #[serde(with = "flexible::option", default)]
        until: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_flexible_serde() {
        let parsed: Stamped =
            serde_json::from_str(r#"{"at":"2024-06-01T12:00:00.5","until":null}"#).unwrap();
        assert_eq!(parsed.at.hour(), 12);
        assert!(parsed.until.is_none());

        let parsed: Stamped = serde_json::from_str(r#"{"at":"2024-06-01T12:00:00Z"}"#).unwrap();
        assert!(parsed.until.is_none());

        let json = serde_json::to_string(&Stamped {
            at: now(),
            until: Some(now()),
        })
        .unwrap();
        assert!(json.contains("\"at\":\"2024-06-01T12:00:00.000Z\""));
        assert!(json.contains("\"until\":\"2024-06-01T12:00:00.000Z\""));
    }
}
