//! Error types for Man-O-Man
//!
//! This module defines the error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Man-O-Man operations
///
/// The HTTP client surfaces one of `Network`, `Http` or `Timeout`; callers
/// that need the distinction match on the variant or inspect [`status`].
///
/// [`status`]: ManomanError::status
#[derive(Error, Debug)]
pub enum ManomanError {
    /// Configuration-related errors (invalid settings, bad patches)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure: DNS, connection refused, TLS, reset
    #[error("{0}")]
    Network(String),

    /// The server responded with a non-2xx status
    #[error("HTTP error! status: {status} {status_text}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for the status
        status_text: String,
    },

    /// No response arrived inside the configured bound
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Multipart upload rejected by the server
    #[error("Upload failed: {status} {status_text}")]
    Upload {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for the status
        status_text: String,
    },

    /// Malformed JSON in a response body, stored blob or pasted import
    #[error("Parse error: {0}")]
    Parse(String),

    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ManomanError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Upload { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Result type alias for Man-O-Man operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Result type returned by the HTTP client, keeping the error typed.
pub type ClientResult<T> = std::result::Result<T, ManomanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ManomanError::Config("maxRetries out of range".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: maxRetries out of range"
        );
    }

    #[test]
    fn test_http_error_display_and_status() {
        let error = ManomanError::Http {
            status: 503,
            status_text: "Service Unavailable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "HTTP error! status: 503 Service Unavailable"
        );
        assert_eq!(error.status(), Some(503));
        assert!(!error.is_transport());
    }

    #[test]
    fn test_network_error_keeps_raw_message() {
        let error = ManomanError::Network("error trying to connect: refused".to_string());
        assert_eq!(error.to_string(), "error trying to connect: refused");
        assert_eq!(error.status(), None);
        assert!(error.is_transport());
    }

    #[test]
    fn test_timeout_error_display() {
        let error = ManomanError::Timeout(30_000);
        assert_eq!(error.to_string(), "Request timed out after 30000ms");
        assert!(error.is_transport());
    }

    #[test]
    fn test_upload_error_display() {
        let error = ManomanError::Upload {
            status: 413,
            status_text: "Payload Too Large".to_string(),
        };
        assert_eq!(error.to_string(), "Upload failed: 413 Payload Too Large");
        assert_eq!(error.status(), Some(413));
    }

    #[test]
    fn test_storage_error_display() {
        let error = ManomanError::Storage("flush failed".to_string());
        assert_eq!(error.to_string(), "Storage error: flush failed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ManomanError = io_error.into();
        assert!(matches!(error, ManomanError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: ManomanError = json_error.into();
        assert!(matches!(error, ManomanError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ManomanError>();
    }
}
