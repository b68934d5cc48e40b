//! Duration parsing for CLI arguments.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "10s", "500ms" or "300".
/// Supports:
/// - Plain numbers (interpreted as seconds, fractions allowed): "2.5"
/// - Milliseconds suffix: "500ms"
/// - Seconds suffix: "10s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid milliseconds value: {num_str}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        let secs = hours
            .checked_mul(3600)
            .with_context(|| format!("Duration out of range: {s}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        let secs = minutes
            .checked_mul(60)
            .with_context(|| format!("Duration out of range: {s}"))?;
        return Ok(Duration::from_secs(secs));
    }
    let num_str = s.strip_suffix('s').unwrap_or(s);
    let secs: f64 = num_str
        .parse()
        .with_context(|| format!("Invalid duration value: {s}"))?;
    Duration::try_from_secs_f64(secs).with_context(|| format!("Duration out of range: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("300").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2.5").unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("1.5m").is_err());
    }

    #[test]
    fn test_parse_out_of_range() {
        assert!(parse_duration("6000000000000000h").is_err());
        assert!(parse_duration("400000000000000000m").is_err());
        assert!(parse_duration("1e300").is_err());
        assert_eq!(
            parse_duration("5124095576030431h").unwrap(),
            Duration::from_secs(5_124_095_576_030_431 * 3600)
        );
    }
}
