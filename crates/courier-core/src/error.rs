//! Error types for the courier delivery core.
//!
//! Every runtime failure is one of six kinds. Each error carries its kind and a
//! human-readable detail so callers can decide between retrying and aborting;
//! none of the core components decide UI behavior themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using CourierError as the error type.
pub type Result<T> = std::result::Result<T, CourierError>;

/// Runtime error surfaced by the location, routing, assignment, and map components.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum CourierError {
    /// Location permission was not requested or was refused
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The platform could not produce a position (timeout, disabled sensor)
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// Request failure or timeout talking to a remote collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed or truncated encoded data
    #[error("Decode error: {0}")]
    Decode(String),

    /// Input rejected before or by the backend
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend reports a competing change (e.g. assignment taken by another courier)
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Discriminant of a [`CourierError`], convenient for matching in callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Network,
    Decode,
    Validation,
    Conflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::PermissionDenied => write!(f, "permission_denied"),
            ErrorKind::PositionUnavailable => write!(f, "position_unavailable"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Decode => write!(f, "decode"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Conflict => write!(f, "conflict"),
        }
    }
}

impl CourierError {
    /// Creates a permission denied error.
    pub fn permission_denied(detail: impl Into<String>) -> Self {
        Self::PermissionDenied(detail.into())
    }

    /// Creates a position unavailable error.
    pub fn position_unavailable(detail: impl Into<String>) -> Self {
        Self::PositionUnavailable(detail.into())
    }

    /// Creates a network error.
    pub fn network(detail: impl Into<String>) -> Self {
        Self::Network(detail.into())
    }

    /// Creates a decode error.
    pub fn decode(detail: impl Into<String>) -> Self {
        Self::Decode(detail.into())
    }

    /// Creates a validation error.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    /// Creates a conflict error.
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict(detail.into())
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CourierError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            CourierError::PositionUnavailable(_) => ErrorKind::PositionUnavailable,
            CourierError::Network(_) => ErrorKind::Network,
            CourierError::Decode(_) => ErrorKind::Decode,
            CourierError::Validation(_) => ErrorKind::Validation,
            CourierError::Conflict(_) => ErrorKind::Conflict,
        }
    }

    /// Returns the human-readable detail.
    pub fn detail(&self) -> &str {
        match self {
            CourierError::PermissionDenied(d)
            | CourierError::PositionUnavailable(d)
            | CourierError::Network(d)
            | CourierError::Decode(d)
            | CourierError::Validation(d)
            | CourierError::Conflict(d) => d,
        }
    }

    /// Returns true if the same call may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CourierError::Network(_) | CourierError::PositionUnavailable(_)
        )
    }
}

/// Errors related to configuration.
///
/// These occur when loading, parsing, or validating configuration files and
/// are kept apart from the runtime taxonomy above.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_detail() {
        let err = CourierError::decode("truncated path at byte 7");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.detail(), "truncated path at byte 7");
        assert_eq!(err.to_string(), "Decode error: truncated path at byte 7");
    }

    #[test]
    fn test_retryable() {
        assert!(CourierError::network("timeout").is_retryable());
        assert!(CourierError::position_unavailable("gps off").is_retryable());
        assert!(!CourierError::validation("bad target").is_retryable());
        assert!(!CourierError::conflict("taken").is_retryable());
        assert!(!CourierError::permission_denied("refused").is_retryable());
    }

    #[test]
    fn test_error_serialization() {
        let err = CourierError::conflict("assignment already taken");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"Conflict\""));
        assert!(json.contains("assignment already taken"));

        let back: CourierError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_config_error_helpers() {
        let err = ConfigError::invalid_value("routing.timeout_secs", "must be positive");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("routing.timeout_secs"));
    }
}
