//! Header parsing for task monitors.

use chrono::{DateTime, Utc};
use http::header::{HeaderMap, LOCATION, RETRY_AFTER};
use std::time::Duration;

/// Returns the `Location` header, if present and non-empty.
pub fn location(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Returns the `Retry-After` delay relative to `now`.
///
/// Accepts delta-seconds (`"5"`, `"1.5"`) and HTTP-dates
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Zero, negative, past or
/// unparseable hints yield `None` so the caller falls back to its default
/// interval.
pub fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    parse_retry_after(raw, now)
}

/// Parses a raw `Retry-After` value. See [`retry_after`].
pub fn parse_retry_after(raw: &str, now: DateTime<Utc>) -> Option<Duration> {
    if let Ok(secs) = raw.parse::<f64>() {
        return Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|d| !d.is_zero());
    }

    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok().filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()
    }

    #[rstest]
    #[case("5", Some(Duration::from_secs(5)))]
    #[case(" 2 ", Some(Duration::from_secs(2)))]
    #[case("1.5", Some(Duration::from_millis(1500)))]
    #[case("0", None)]
    #[case("-3", None)]
    #[case("NaN", None)]
    #[case("1e30", None)]
    #[case("1e-12", None)]
    #[case("soon", None)]
    #[case("Wed, 21 Oct 2015 07:28:30 GMT", Some(Duration::from_secs(30)))]
    #[case("Wed, 21 Oct 2015 07:27:00 GMT", None)]
    #[case("Wed, 21 Oct 2015 07:28:00 GMT", None)]
    fn parses_pacing_hints(#[case] raw: &str, #[case] expected: Option<Duration>) {
        assert_eq!(parse_retry_after(raw.trim(), now()), expected);
    }

    #[test]
    fn reads_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(location(&headers), None);
        assert_eq!(retry_after(&headers, now()), None);

        headers.insert(LOCATION, HeaderValue::from_static("/redfish/v1/TaskMonitors/1"));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(location(&headers).as_deref(), Some("/redfish/v1/TaskMonitors/1"));
        assert_eq!(retry_after(&headers, now()), Some(Duration::from_secs(3)));
    }

    #[test]
    fn blank_location_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static("  "));
        assert_eq!(location(&headers), None);
    }
}
