//! Rate limit bookkeeping for one credential.
//!
//! The platform reports the quota of the calling credential on every response
//! through `x-ratelimit-*` headers. The transport keeps the most recent
//! snapshot and consults it before bulk operations.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;

/// Requests kept in reserve before the pre-flight throttle kicks in.
pub const MIN_REMAINING_REQUESTS: u64 = 10;

/// Extra wait after the advertised reset time.
pub const RESET_BUFFER: Duration = Duration::from_secs(5);

/// Snapshot of the rate limit quota from the most recent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests allowed per window
    pub limit: u64,
    /// Requests left in the current window
    pub remaining: u64,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Read the quota from response headers.
    ///
    /// Returns `None` unless `x-ratelimit-remaining` and `x-ratelimit-reset`
    /// are both present and numeric.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = header_u64(headers, "x-ratelimit-remaining")?;
        let reset = header_u64(headers, "x-ratelimit-reset")?;
        let limit = header_u64(headers, "x-ratelimit-limit").unwrap_or(remaining);
        let reset_at = Utc.timestamp_opt(i64::try_from(reset).ok()?, 0).single()?;

        Some(Self {
            limit,
            remaining,
            reset_at,
        })
    }

    /// How long to wait before starting a bulk operation.
    ///
    /// Sleeps only while the quota is at or below `threshold` and the window
    /// has not reset yet; the wait runs until the reset plus `buffer`.
    #[must_use]
    pub fn throttle_delay(
        &self,
        threshold: u64,
        buffer: Duration,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        if self.remaining > threshold || self.reset_at <= now {
            return None;
        }

        let until_reset = (self.reset_at - now).to_std().ok()?;
        Some(until_reset + buffer)
    }

    /// Whether the response that produced this snapshot exhausted the quota.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Parse a `Retry-After` header given in seconds.
#[must_use]
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    header_u64(headers, "retry-after")
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use reqwest::header::HeaderValue;

    fn info(remaining: u64, reset_in_secs: i64, now: DateTime<Utc>) -> RateLimitInfo {
        RateLimitInfo {
            limit: 5000,
            remaining,
            reset_at: now + ChronoDuration::seconds(reset_in_secs),
        }
    }

    #[test]
    fn test_no_throttle_when_quota_is_healthy() {
        let now = Utc::now();
        let rl = info(4500, 3600, now);
        assert_eq!(rl.throttle_delay(MIN_REMAINING_REQUESTS, RESET_BUFFER, now), None);
    }

    #[test]
    fn test_throttle_near_limit_waits_until_reset_plus_buffer() {
        let now = Utc::now();
        let rl = info(5, 30, now);

        let delay = rl
            .throttle_delay(MIN_REMAINING_REQUESTS, RESET_BUFFER, now)
            .expect("Should throttle");
        assert_eq!(delay, Duration::from_secs(35));
    }

    #[test]
    fn test_throttle_at_threshold() {
        let now = Utc::now();
        let rl = info(MIN_REMAINING_REQUESTS, 60, now);
        assert!(rl.throttle_delay(MIN_REMAINING_REQUESTS, RESET_BUFFER, now).is_some());

        let above = info(MIN_REMAINING_REQUESTS + 1, 60, now);
        assert!(above.throttle_delay(MIN_REMAINING_REQUESTS, RESET_BUFFER, now).is_none());
    }

    #[test]
    fn test_no_throttle_when_window_already_reset() {
        let now = Utc::now();
        let rl = info(0, -10, now);
        assert_eq!(rl.throttle_delay(MIN_REMAINING_REQUESTS, RESET_BUFFER, now), None);
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4987"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));

        let rl = RateLimitInfo::from_headers(&headers).expect("Should parse");
        assert_eq!(rl.limit, 5000);
        assert_eq!(rl.remaining, 4987);
        assert_eq!(rl.reset_at.timestamp(), 1_700_000_000);
        assert!(!rl.is_exhausted());
    }

    #[test]
    fn test_from_headers_missing_reset() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("10"));
        assert!(RateLimitInfo::from_headers(&headers).is_none());
    }

    #[test]
    fn test_retry_after_secs() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("60"));
        assert_eq!(retry_after_secs(&headers), Some(60));
    }
}
