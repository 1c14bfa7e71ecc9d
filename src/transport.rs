//! HTTP transport for the platform REST API.
//!
//! Handles bearer authentication, automatic retry with exponential backoff,
//! rate limit tracking, pagination and error response parsing.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rand::thread_rng;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, Error};
use crate::rate_limit::{retry_after_secs, RateLimitInfo, MIN_REMAINING_REQUESTS, RESET_BUFFER};

/// Page size requested from listing endpoints.
pub const PER_PAGE: usize = 100;

const API_VERSION: &str = "2022-11-28";

/// Configuration for automatic retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied per attempt
    pub backoff_factor: f64,
    /// Whether a `Retry-After` header sets a floor on the delay
    pub respect_retry_after: bool,
    /// Maximum computed backoff
    pub max_backoff: Duration,
    /// Jitter factor (0.1 = ±10%)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            respect_retry_after: true,
            max_backoff: Duration::from_secs(60),
            jitter: 0.1,
        }
    }
}

/// HTTP transport bound to one credential and one API host.
///
/// Handles:
/// - Bearer authentication and API version headers
/// - Exponential backoff with jitter for transient failures
/// - `Retry-After` and `x-ratelimit-*` header tracking
/// - Error response parsing into typed errors
pub struct HttpTransport {
    base_url: String,
    token: String,
    client: Client,
    retry_config: RetryConfig,
    rate_limit: Mutex<Option<RateLimitInfo>>,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root (e.g., "<https://api.github.com>")
    /// * `token` - Bearer token for every request
    /// * `timeout` - Per-request timeout
    /// * `retry_config` - Configuration for retry behavior
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: Duration,
        retry_config: Option<RetryConfig>,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vars-migrator/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
            retry_config: retry_config.unwrap_or_default(),
            rate_limit: Mutex::new(None),
        })
    }

    /// GET a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` on non-success responses after retries, or an
    /// HTTP error if the body cannot be parsed.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = self
            .execute_with_retry(Method::GET, path, &[], None)
            .await?;
        parse_json(response).await
    }

    /// GET a JSON document together with its response headers.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` on non-success responses after retries.
    pub async fn get_with_headers<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<(T, HeaderMap), Error> {
        let response = self
            .execute_with_retry(Method::GET, path, &[], None)
            .await?;
        let headers = response.headers().clone();
        Ok((parse_json(response).await?, headers))
    }

    /// GET every page of a listing endpoint.
    ///
    /// Pages are requested with `per_page=100` until a short page comes back.
    ///
    /// # Errors
    ///
    /// Returns the first error from any page.
    pub async fn get_paginated<P, T, F>(&self, path: &str, items: F) -> Result<Vec<T>, Error>
    where
        P: DeserializeOwned,
        F: Fn(P) -> Vec<T>,
    {
        let mut all = Vec::new();
        let per_page = PER_PAGE.to_string();

        for page in 1.. {
            let page_number = page.to_string();
            let response = self
                .execute_with_retry(
                    Method::GET,
                    path,
                    &[("per_page", per_page.as_str()), ("page", page_number.as_str())],
                    None,
                )
                .await?;

            let batch = items(parse_json::<P>(response).await?);
            let len = batch.len();
            all.extend(batch);

            if len < PER_PAGE {
                break;
            }
        }

        Ok(all)
    }

    /// Send a JSON body and parse the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` on non-success responses after retries.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let body = serde_json::to_value(body)?;
        let response = self
            .execute_with_retry(method, path, &[], Some(body))
            .await?;
        parse_json(response).await
    }

    /// Send a JSON body, discarding any response body.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` on non-success responses after retries.
    pub async fn send_no_content(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<(), Error> {
        let body = serde_json::to_value(body)?;
        self.execute_with_retry(method, path, &[], Some(body))
            .await?;
        Ok(())
    }

    /// Sleep until the quota resets if it is nearly exhausted.
    ///
    /// Called before bulk operations. Uses the snapshot from the most recent
    /// response; does nothing before the first request or once the reset time
    /// has passed.
    pub async fn wait_for_rate_limit(&self) {
        let Some(info) = self.rate_limit() else {
            return;
        };

        if let Some(wait) = info.throttle_delay(MIN_REMAINING_REQUESTS, RESET_BUFFER, Utc::now()) {
            warn!(
                host = %self.base_url,
                remaining = info.remaining,
                limit = info.limit,
                reset_at = %info.reset_at,
                wait_secs = wait.as_secs(),
                "Rate limit nearly exhausted, waiting for reset"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Execute a request with automatic retry on retryable errors.
    ///
    /// Returns the first successful response.
    async fn execute_with_retry(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Response, Error> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut attempt = 0;

        loop {
            debug!(method = %method, url = %url, attempt, "Sending request");

            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.token);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(b) = &body {
                request = request.json(b);
            }

            let error = match request.send().await {
                Ok(response) => {
                    self.record_rate_limit(response.headers());

                    if response.status().is_success() {
                        return Ok(response);
                    }
                    Error::Api(parse_error_response(response).await)
                }
                Err(e) if e.is_builder() => Error::Request(e.to_string()),
                // Network errors, timeouts included, are retryable
                Err(e) => Error::Http(e.to_string()),
            };

            if !self.should_retry(&error, attempt) {
                return Err(error);
            }

            let retry_after = match &error {
                Error::Api(api) => api.retry_after(),
                _ => None,
            };
            let wait = self.get_backoff_time(attempt, retry_after);

            warn!(
                method = %method,
                url = %url,
                attempt = attempt + 1,
                max_retries = self.retry_config.max_retries,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Transient failure, retrying"
            );

            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    /// Determine if a request should be retried.
    fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        attempt < self.retry_config.max_retries && error.is_retryable()
    }

    /// Calculate backoff time for retry.
    ///
    /// Uses exponential backoff with jitter capped at `max_backoff`; a
    /// `Retry-After` value raises the result to at least that many seconds.
    fn get_backoff_time(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_wait =
            self.retry_config.base_delay.as_secs_f64() * self.retry_config.backoff_factor.powi(exponent);

        // Apply jitter (±jitter%) if there is anything to jitter
        let jitter_range = base_wait * self.retry_config.jitter;
        let wait_time = if jitter_range > 0.0 {
            base_wait + thread_rng().gen_range(-jitter_range..jitter_range)
        } else {
            base_wait
        };

        let capped = wait_time
            .max(0.0)
            .min(self.retry_config.max_backoff.as_secs_f64());
        let wait = Duration::from_secs_f64(capped);

        match retry_after {
            Some(ra) if self.retry_config.respect_retry_after => wait.max(Duration::from_secs(ra)),
            _ => wait,
        }
    }

    fn record_rate_limit(&self, headers: &HeaderMap) {
        if let Some(info) = RateLimitInfo::from_headers(headers) {
            *self.rate_limit.lock().unwrap_or_else(|e| e.into_inner()) = Some(info);
        }
    }

    /// Get the most recent rate limit snapshot.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        *self.rate_limit.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Read a success body; a body that is not the expected JSON is not retried.
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Http(format!("Failed to read response body: {e}")))?;
    Ok(serde_json::from_slice(&body)?)
}

/// Parse an error response into a typed error.
async fn parse_error_response(response: Response) -> ApiError {
    let status = response.status();
    let headers = response.headers().clone();
    let request_id = headers
        .get("x-github-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let data: Value = response.json().await.unwrap_or_else(|_| serde_json::json!({}));
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| format!("HTTP {}", status.as_u16()), String::from);

    let rate_limit = RateLimitInfo::from_headers(&headers);
    let retry_after = retry_after_secs(&headers);

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Authentication {
            message,
            request_id,
        },
        // Primary and secondary rate limits are reported as 403 or 429
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            if status == StatusCode::TOO_MANY_REQUESTS
                || retry_after.is_some()
                || rate_limit.is_some_and(|rl| rl.is_exhausted())
                || message.to_lowercase().contains("rate limit") =>
        {
            let until_reset = rate_limit
                .filter(RateLimitInfo::is_exhausted)
                .and_then(|rl| (rl.reset_at - Utc::now()).to_std().ok())
                .map(|d| d.as_secs());
            ApiError::RateLimited {
                message,
                retry_after: retry_after.or(until_reset),
                request_id,
            }
        }
        StatusCode::FORBIDDEN => ApiError::Authorization {
            message,
            request_id,
        },
        StatusCode::NOT_FOUND => ApiError::NotFound {
            message,
            request_id,
        },
        StatusCode::CONFLICT => ApiError::Conflict {
            message,
            request_id,
        },
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            message,
            request_id,
        },
        s => ApiError::Validation {
            status: s.as_u16(),
            message,
            request_id,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay, Duration::from_secs(1));
        assert!((config.backoff_factor - 2.0).abs() < f64::EPSILON);
        assert!(config.respect_retry_after);
    }

    #[test]
    fn test_should_retry() {
        let transport = create_test_transport(RetryConfig::default());

        let rate_limited = Error::Api(ApiError::RateLimited {
            message: "slow down".to_string(),
            retry_after: None,
            request_id: None,
        });
        assert!(transport.should_retry(&rate_limited, 0));
        assert!(transport.should_retry(&rate_limited, 2));
        assert!(!transport.should_retry(&rate_limited, 3)); // Max retries reached

        let server = Error::Api(ApiError::Server {
            status: 503,
            message: "unavailable".to_string(),
            request_id: None,
        });
        assert!(transport.should_retry(&server, 0));
        assert!(transport.should_retry(&Error::Http("timed out".to_string()), 0));

        let not_found = Error::Api(ApiError::NotFound {
            message: "Not Found".to_string(),
            request_id: None,
        });
        assert!(!transport.should_retry(&not_found, 0));

        let invalid = Error::Api(ApiError::Validation {
            status: 422,
            message: "Invalid".to_string(),
            request_id: None,
        });
        assert!(!transport.should_retry(&invalid, 0));
    }

    #[test]
    fn test_backoff_time_exponential() {
        let config = RetryConfig {
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            jitter: 0.0, // No jitter for deterministic test
            ..Default::default()
        };
        let transport = create_test_transport(config);

        assert_eq!(transport.get_backoff_time(0, None), Duration::from_secs(1));
        assert_eq!(transport.get_backoff_time(1, None), Duration::from_secs(2));
        assert_eq!(transport.get_backoff_time(2, None), Duration::from_secs(4));
        assert_eq!(transport.get_backoff_time(3, None), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_time_retry_after_is_a_floor() {
        let config = RetryConfig {
            jitter: 0.0,
            ..Default::default()
        };
        let transport = create_test_transport(config);

        // Retry-After longer than the computed backoff wins
        assert_eq!(transport.get_backoff_time(0, Some(30)), Duration::from_secs(30));
        // Computed backoff longer than Retry-After wins
        assert_eq!(transport.get_backoff_time(3, Some(1)), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_time_ignores_retry_after_when_disabled() {
        let config = RetryConfig {
            jitter: 0.0,
            respect_retry_after: false,
            ..Default::default()
        };
        let transport = create_test_transport(config);

        assert_eq!(transport.get_backoff_time(0, Some(30)), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_time_capped_at_max() {
        let config = RetryConfig {
            backoff_factor: 10.0,
            jitter: 0.0,
            max_backoff: Duration::from_secs(30),
            ..Default::default()
        };
        let transport = create_test_transport(config);

        // 10^3 = 1000, but should be capped at 30
        assert_eq!(transport.get_backoff_time(3, None), Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_time_jitter_stays_in_range() {
        let transport = create_test_transport(RetryConfig::default());

        for _ in 0..50 {
            let wait = transport.get_backoff_time(1, None).as_secs_f64();
            assert!((1.8..=2.2).contains(&wait), "wait {wait} out of range");
        }
    }

    #[test]
    fn test_zero_base_delay_does_not_panic() {
        let config = RetryConfig {
            base_delay: Duration::ZERO,
            ..Default::default()
        };
        let transport = create_test_transport(config);
        assert_eq!(transport.get_backoff_time(2, None), Duration::ZERO);
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let transport = HttpTransport::new(
            "https://api.github.com/",
            "token",
            Duration::from_secs(30),
            None,
        )
        .expect("transport creation should succeed");
        assert_eq!(transport.base_url(), "https://api.github.com");
        assert!(transport.rate_limit().is_none());
    }

    fn create_test_transport(config: RetryConfig) -> HttpTransport {
        HttpTransport::new(
            "https://api.github.com",
            "test-token",
            Duration::from_secs(30),
            Some(config),
        )
        .expect("transport creation should succeed")
    }
}
