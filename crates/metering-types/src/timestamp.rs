//! Timestamp parsing for configuration values.

use crate::error::{ConfigError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a timestamp as RFC 3339, falling back to a naive
/// `YYYY-MM-DDTHH:MM:SS` value interpreted as UTC.
pub fn parse_metering_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(ConfigError::InvalidTimestamp {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_naive() {
        let dt = parse_metering_timestamp("2021-11-04T16:12:26").unwrap();
        assert_eq!(dt.year(), 2021);
        assert_eq!(dt.month(), 11);
        assert_eq!(dt.hour(), 16);
        assert_eq!(dt.second(), 26);
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_metering_timestamp("2021-12-14T19:20:00+01:00").unwrap();
        assert_eq!(dt.hour(), 18);
    }

    #[test]
    fn test_parse_invalid() {
        let err = parse_metering_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimestamp { .. }));
    }
}
