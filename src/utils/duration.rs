use chrono::Duration;
use lazy_static::lazy_static;
use regex::Regex;

const SECOND: f64 = 1000.0;
const MINUTE: f64 = SECOND * 60.0;
const HOUR: f64 = MINUTE * 60.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const YEAR: f64 = DAY * 365.25;

lazy_static! {
    static ref DURATION_RE: Regex = Regex::new(
        r"(?i)^(-?(?:\d+)?\.?\d+) *(milliseconds?|msecs?|ms|seconds?|secs?|s|minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|w|years?|yrs?|y)?$"
    )
    .expect("duration regex is valid");
}

/// Parses expiry strings such as `7d`, `12h`, `90 minutes` or `1.5 hours`.
/// A bare number is read as milliseconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() || input.len() > 100 {
        return None;
    }

    let caps = DURATION_RE.captures(input)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "ms".to_string());

    let multiplier = match unit.as_str() {
        "years" | "year" | "yrs" | "yr" | "y" => YEAR,
        "weeks" | "week" | "w" => WEEK,
        "days" | "day" | "d" => DAY,
        "hours" | "hour" | "hrs" | "hr" | "h" => HOUR,
        "minutes" | "minute" | "mins" | "min" | "m" => MINUTE,
        "seconds" | "second" | "secs" | "sec" | "s" => SECOND,
        _ => 1.0,
    };

    let millis = (value * multiplier).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    Some(Duration::milliseconds(millis as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_units() {
        assert_eq!(parse_duration("7d"), Some(Duration::days(7)));
        assert_eq!(parse_duration("24h"), Some(Duration::hours(24)));
        assert_eq!(parse_duration("30 minutes"), Some(Duration::minutes(30)));
        assert_eq!(parse_duration("45s"), Some(Duration::seconds(45)));
        assert_eq!(parse_duration("2 Weeks"), Some(Duration::weeks(2)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::minutes(90)));
    }

    #[test]
    fn bare_number_is_milliseconds() {
        assert_eq!(parse_duration("1500"), Some(Duration::milliseconds(1500)));
    }

    #[test]
    fn year_is_a_julian_year() {
        assert_eq!(
            parse_duration("1y"),
            Some(Duration::milliseconds((365.25 * 24.0 * 3600.0 * 1000.0) as i64))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("seven days"), None);
        assert_eq!(parse_duration("7 fortnights"), None);
        assert_eq!(parse_duration(&"1".repeat(101)), None);
    }
}
