//! Error types for the variables migrator.
//!
//! `ApiError` is the typed view of a failed platform response; `Error` wraps
//! it together with transport, configuration and pre-flight failures.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::types::Side;

/// Main error type for the migrator.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error (connection refused, timeout, body read failure)
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization error, including malformed response bodies
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request could not be built (invalid URL, header or client setup)
    #[error("Invalid request: {0}")]
    Request(String),

    /// Invalid migration configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A credential could not be resolved for one side
    #[error("Credential error: {0}")]
    Credential(String),

    /// One or both credentials were rejected by the platform
    #[error("{}", AuthFailure::join(.0))]
    Authentication(Vec<AuthFailure>),

    /// The credential authenticated but lacks a required capability
    #[error(
        "{side} token is missing required scope {required:?} for {purpose}\n  Current scopes: {}\n  {hint}",
        .granted.join(", ")
    )]
    MissingCapability {
        side: Side,
        required: String,
        purpose: String,
        granted: Vec<String>,
        hint: String,
    },

    /// Platform API error
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// Check if this error may succeed when the request is repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api(api) => api.is_retryable(),
            _ => false,
        }
    }

    /// Check if this error is a 404 from the platform.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(ApiError::NotFound { .. }))
    }
}

/// A rejected credential on one side of the migration.
#[derive(Debug)]
pub struct AuthFailure {
    pub side: Side,
    pub reason: String,
}

impl AuthFailure {
    fn join(failures: &[AuthFailure]) -> String {
        failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} authentication failed: {}. Please check your {} credentials",
            self.side, self.reason, self.side
        )
    }
}

/// Typed errors for platform API responses.
///
/// Each variant corresponds to an error category of the REST API.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// Credential rejected (401).
    #[error("{message} (HTTP 401)")]
    Authentication {
        message: String,
        request_id: Option<String>,
    },

    /// Access denied (403 that is not a rate limit).
    #[error("{message} (HTTP 403)")]
    Authorization {
        message: String,
        request_id: Option<String>,
    },

    /// Resource not found (404).
    #[error("{message} (HTTP 404)")]
    NotFound {
        message: String,
        request_id: Option<String>,
    },

    /// Resource already exists or is in a conflicting state (409).
    #[error("{message} (HTTP 409)")]
    Conflict {
        message: String,
        request_id: Option<String>,
    },

    /// Primary or secondary rate limit hit (429, or 403 with an exhausted quota).
    #[error("{message} (rate limited{})", .retry_after.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
        request_id: Option<String>,
    },

    /// Request rejected for any other client-side reason (400, 422, ...).
    #[error("{message} (HTTP {status})")]
    Validation {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// Server-side failure (5xx).
    #[error("{message} (HTTP {status})")]
    Server {
        status: u16,
        message: String,
        request_id: Option<String>,
    },
}

impl ApiError {
    /// Get the HTTP status this error was built from.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Authentication { .. } => 401,
            Self::Authorization { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::RateLimited { .. } => 429,
            Self::Validation { status, .. } | Self::Server { status, .. } => *status,
        }
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message, .. }
            | Self::Authorization { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::RateLimited { message, .. }
            | Self::Validation { message, .. }
            | Self::Server { message, .. } => message,
        }
    }

    /// Get the `x-github-request-id` if the response carried one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Authentication { request_id, .. }
            | Self::Authorization { request_id, .. }
            | Self::NotFound { request_id, .. }
            | Self::Conflict { request_id, .. }
            | Self::RateLimited { request_id, .. }
            | Self::Validation { request_id, .. }
            | Self::Server { request_id, .. } => request_id.as_deref(),
        }
    }

    /// Get the retry-after value for rate limited errors.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_accessors() {
        let error = ApiError::NotFound {
            message: "Not Found".to_string(),
            request_id: Some("ABCD:1234".to_string()),
        };

        assert_eq!(error.status(), 404);
        assert_eq!(error.message(), "Not Found");
        assert_eq!(error.request_id(), Some("ABCD:1234"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_rate_limited_error() {
        let error = ApiError::RateLimited {
            message: "API rate limit exceeded".to_string(),
            retry_after: Some(30),
            request_id: None,
        };

        assert_eq!(error.retry_after(), Some(30));
        assert!(error.is_retryable());
        assert!(error.to_string().contains("retry after 30s"));
    }

    #[test]
    fn test_server_error_is_retryable() {
        let error = ApiError::Server {
            status: 502,
            message: "Bad Gateway".to_string(),
            request_id: None,
        };

        assert!(error.is_retryable());
        assert!(Error::Api(error).is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let validation = ApiError::Validation {
            status: 422,
            message: "Invalid name".to_string(),
            request_id: None,
        };
        assert!(!validation.is_retryable());

        let auth = ApiError::Authentication {
            message: "Bad credentials".to_string(),
            request_id: None,
        };
        assert!(!Error::Api(auth).is_retryable());
    }

    #[test]
    fn test_http_error_is_retryable() {
        assert!(Error::Http("connection reset".to_string()).is_retryable());
        assert!(!Error::Credential("no token".to_string()).is_retryable());
    }

    #[test]
    fn test_malformed_and_invalid_requests_are_not_retryable() {
        assert!(!Error::Request("relative URL without a base".to_string()).is_retryable());

        let malformed = serde_json::from_str::<serde_json::Value>("{not json")
            .map_err(Error::from)
            .unwrap_err();
        assert!(matches!(malformed, Error::Serialization(_)));
        assert!(!malformed.is_retryable());
    }

    #[test]
    fn test_is_not_found() {
        let error = Error::Api(ApiError::NotFound {
            message: "Not Found".to_string(),
            request_id: None,
        });
        assert!(error.is_not_found());
        assert!(!Error::Http("timeout".to_string()).is_not_found());
    }

    #[test]
    fn test_authentication_error_reports_both_sides() {
        let error = Error::Authentication(vec![
            AuthFailure {
                side: Side::Source,
                reason: "Bad credentials".to_string(),
            },
            AuthFailure {
                side: Side::Target,
                reason: "Bad credentials".to_string(),
            },
        ]);

        let text = error.to_string();
        assert!(text.contains("source authentication failed"));
        assert!(text.contains("target authentication failed"));
    }

    #[test]
    fn test_missing_capability_message() {
        let error = Error::MissingCapability {
            side: Side::Target,
            required: "admin:org".to_string(),
            purpose: "organization variable migration".to_string(),
            granted: vec!["repo".to_string(), "workflow".to_string()],
            hint: "Create a token with the 'admin:org' scope".to_string(),
        };

        let text = error.to_string();
        assert!(text.starts_with("target token is missing required scope \"admin:org\""));
        assert!(text.contains("Current scopes: repo, workflow"));
    }
}
