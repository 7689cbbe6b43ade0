//! `Retry-After` header parsing.

use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// Parses the `Retry-After` header into the instant a retry may happen.
///
/// Supports both delay-seconds (`"60"`, also `"60.0"`) and HTTP-date formats.
/// Returns `None` when the header is absent or malformed, or when the delay
/// does not fit in a `SystemTime`.
///
/// # Examples
///
/// ```
/// use courier::codec::parse_retry_after;
/// use http::HeaderMap;
/// use std::time::{Duration, SystemTime};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "60".parse().unwrap());
///
/// let now = SystemTime::now();
/// assert_eq!(parse_retry_after(&headers, now), Some(now + Duration::from_secs(60)));
/// ```
pub fn parse_retry_after(headers: &HeaderMap, now: SystemTime) -> Option<SystemTime> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Some(seconds) = parse_delay_seconds(header) {
        return now.checked_add(Duration::from_secs(seconds));
    }

    httpdate::parse_http_date(header).ok()
}

fn parse_delay_seconds(value: &str) -> Option<u64> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if !fraction.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));

        let now = SystemTime::now();
        assert_eq!(
            parse_retry_after(&headers, now),
            Some(now + Duration::from_secs(60))
        );
    }

    #[test]
    fn test_parse_retry_after_decimal_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2.0"));

        let now = SystemTime::now();
        assert_eq!(
            parse_retry_after(&headers, now),
            Some(now + Duration::from_secs(2))
        );

        headers.insert("retry-after", HeaderValue::from_static("2.5"));
        assert_eq!(parse_retry_after(&headers, now), None);
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_445_412_480);
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&httpdate::fmt_http_date(at)).unwrap(),
        );

        assert_eq!(parse_retry_after(&headers, SystemTime::now()), Some(at));
    }

    #[test]
    fn test_parse_retry_after_missing_or_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers, SystemTime::now()), None);

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers, SystemTime::now()), None);
    }

    #[test]
    fn test_parse_retry_after_overflowing_delay() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_str(&u64::MAX.to_string()).unwrap(),
        );

        assert_eq!(parse_retry_after(&headers, SystemTime::now()), None);
    }
}
