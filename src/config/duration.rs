//! Duration parsing utilities.

use std::time::Duration;

use anyhow::Context;

/// Parse a duration string like "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (num_str, unit) = match s.char_indices().last() {
        Some((idx, 'h')) => (&s[..idx], 3600),
        Some((idx, 'm')) => (&s[..idx], 60),
        Some((idx, 's')) => (&s[..idx], 1),
        _ => (s, 1),
    };
    let value: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration value: {s}"))?;
    value
        .checked_mul(unit)
        .with_context(|| format!("Duration too large: {s}"))
}

/// [`parse_duration_to_secs`] as a [`Duration`], for clap's `value_parser`.
pub fn parse_interval(s: &str) -> anyhow::Result<Duration> {
    parse_duration_to_secs(s).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration_to_secs("300").unwrap(), 300);
        assert_eq!(parse_duration_to_secs("300s").unwrap(), 300);
        assert_eq!(parse_duration_to_secs("30m").unwrap(), 1800);
        assert_eq!(parse_duration_to_secs("1h").unwrap(), 3600);
        assert_eq!(parse_duration_to_secs(" 0s ").unwrap(), 0);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration_to_secs("").is_err());
        assert!(parse_duration_to_secs("-5s").is_err());
        assert!(parse_duration_to_secs("5d").is_err());
        assert!(parse_duration_to_secs("m").is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
    }
}
