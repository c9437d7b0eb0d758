//! Error types for accountd operations.
//!
//! This module covers process-level failures: configuration loading, input
//! validation, and reaching the directory server in the first place. Failures
//! of individual directory operations are not errors in this sense; they are
//! normalized results carried by the operation log in `accountd-ldap`.

use serde::Serialize;
use thiserror::Error;

/// Main error type for accountd operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to parse a document or payload
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid UUID format
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Directory server is unreachable
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Specialized result type for accountd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error body for serialization.
///
/// Matches the wire shape of operation results: `ok` is always `false` here,
/// so a caller can treat process errors and failed operations uniformly.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    /// Always false
    pub ok: bool,
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidUuid(_) => "INVALID_UUID",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::DirectoryUnavailable(_) => "DIRECTORY_UNAVAILABLE",
        }
    }

    /// Converts the error into an [`ErrorBody`].
    #[must_use]
    pub fn into_error_body(self) -> ErrorBody {
        ErrorBody {
            ok: false,
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: None,
            },
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::DirectoryUnavailable(_))
    }
}

// Conversions from external error types
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidUuid(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::ConfigError("test".to_string()).error_code(),
            "CONFIG_ERROR"
        );
        assert_eq!(
            Error::ParseError("test".to_string()).error_code(),
            "PARSE_ERROR"
        );
        assert_eq!(
            Error::ValidationError("test".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            Error::InvalidRequest("test".to_string()).error_code(),
            "INVALID_REQUEST"
        );
        assert_eq!(
            Error::InvalidUuid("test".to_string()).error_code(),
            "INVALID_UUID"
        );
        assert_eq!(
            Error::InvalidEndpoint("test".to_string()).error_code(),
            "INVALID_ENDPOINT"
        );
        assert_eq!(
            Error::DirectoryUnavailable("test".to_string()).error_code(),
            "DIRECTORY_UNAVAILABLE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::DirectoryUnavailable("ldap://localhost".to_string());
        assert_eq!(err.to_string(), "Directory unavailable: ldap://localhost");

        let err = Error::ValidationError("listen_port out of range".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: listen_port out of range"
        );
    }

    #[test]
    fn test_into_error_body() {
        let err = Error::InvalidRequest("bad dn".to_string());
        let body = err.into_error_body();

        assert!(!body.ok);
        assert_eq!(body.error.code, "INVALID_REQUEST");
        assert_eq!(body.error.message, "Invalid request: bad dn");
        assert!(body.error.details.is_none());
    }

    #[test]
    fn test_should_log() {
        assert!(Error::ConfigError("test".to_string()).should_log());
        assert!(Error::DirectoryUnavailable("test".to_string()).should_log());

        assert!(!Error::ValidationError("test".to_string()).should_log());
        assert!(!Error::InvalidRequest("test".to_string()).should_log());
        assert!(!Error::InvalidUuid("test".to_string()).should_log());
    }

    #[test]
    fn test_from_url_parse_error() {
        let err = url::Url::parse("not a url").unwrap_err();
        let acct_err: Error = err.into();
        assert!(matches!(acct_err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_from_uuid_error() {
        let err = uuid::Uuid::parse_str("not-a-uuid").unwrap_err();
        let acct_err: Error = err.into();
        assert!(matches!(acct_err, Error::InvalidUuid(_)));
        assert_eq!(acct_err.error_code(), "INVALID_UUID");
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let acct_err: Error = err.into();
        assert!(matches!(acct_err, Error::ParseError(_)));
    }

    #[test]
    fn test_error_body_serialization() {
        let body = Error::ConfigError("missing baseDN".to_string()).into_error_body();

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"ok\":false"));
        assert!(json.contains("CONFIG_ERROR"));
        assert!(json.contains("missing baseDN"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_error_clone() {
        let err = Error::ParseError("test".to_string());
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }

    #[test]
    fn test_error_partial_eq() {
        let err1 = Error::InvalidUuid("test".to_string());
        let err2 = Error::InvalidUuid("test".to_string());
        let err3 = Error::InvalidUuid("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
