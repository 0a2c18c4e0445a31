use chrono::{DateTime, Utc};

/// Upper bound for the first retry delay.
pub const BASE_BACKOFF_MS: u64 = 250;

#[must_use]
pub const fn should_retry_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// `base * 2^(attempt - 1)`, exponent capped at 10.
#[must_use]
pub fn retry_delay_ms(base_delay_ms: u64, attempt: u32) -> u64 {
    if base_delay_ms == 0 {
        return 0;
    }
    let exponent = attempt.saturating_sub(1).min(10);
    base_delay_ms.saturating_mul(1_u64 << exponent)
}

/// Seconds or an HTTP date, converted to milliseconds from now.
#[must_use]
pub fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds.saturating_mul(1000));
    }

    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay_ms = retry_at.signed_duration_since(Utc::now()).num_milliseconds();
    if delay_ms <= 0 {
        return Some(0);
    }

    u64::try_from(delay_ms).ok()
}

#[must_use]
pub fn is_retryable_transport(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn retry_status_selection() {
        assert!(should_retry_status(429));
        assert!(should_retry_status(503));
        assert!(!should_retry_status(400));
        assert!(!should_retry_status(401));
        assert!(!should_retry_status(404));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(retry_delay_ms(250, 1), 250);
        assert_eq!(retry_delay_ms(250, 2), 500);
        assert_eq!(retry_delay_ms(250, 3), 1000);
        assert_eq!(retry_delay_ms(0, 5), 0);
        assert_eq!(retry_delay_ms(1, 50), 1024);
    }

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        assert_eq!(parse_retry_after_ms(&headers), Some(3_000));

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after_ms(&headers), None);

        assert_eq!(parse_retry_after_ms(&HeaderMap::new()), None);
    }

    #[test]
    fn retry_after_http_date() {
        let mut headers = HeaderMap::new();
        let raw = (Utc::now() + Duration::seconds(2))
            .to_rfc2822()
            .replace("+0000", "GMT");
        headers.insert(
            "retry-after",
            HeaderValue::from_str(raw.as_str()).expect("retry-after date"),
        );
        let delay = parse_retry_after_ms(&headers).expect("delay from date");
        assert!(delay <= 2_500, "delay should be close to 2s, got {delay}");
        assert!(delay >= 500, "delay should be positive, got {delay}");

        headers.insert(
            "retry-after",
            HeaderValue::from_static("Mon, 01 Jan 2001 00:00:00 GMT"),
        );
        assert_eq!(parse_retry_after_ms(&headers), Some(0));
    }
}
