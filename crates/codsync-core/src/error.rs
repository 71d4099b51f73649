use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur while syncing COD
/// service resources. It uses the `thiserror` crate for ergonomic error
/// handling and automatic conversion from underlying library errors.
///
/// # Error Kinds
///
/// Three families of failure flow through the sync:
/// - transport failures (`ClientError`, `NetworkError`, `Timeout`,
///   `RateLimitExceeded`) - the JSON GET never produced a usable document
/// - missing-data failures (`Generic` with context) - the document arrived
///   but an expected field or list was absent
/// - domain failures (`PortalError`, `ResourceNotFound`) - the portal layer
///   rejected an operation
///
/// Callers that need to distinguish "the endpoint is unreachable" from
/// everything else should use [`AppError::is_transport`] instead of matching
/// on message text.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed.
    ///
    /// This error occurs when requests fail with an HTTP error status or the
    /// response body cannot be read or parsed as JSON.
    #[error("API client error: {0}")]
    ClientError(String),

    /// Network or connection error.
    ///
    /// This error occurs when a request fails due to connectivity issues,
    /// DNS resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// JSON serialization or deserialization failed.
    ///
    /// This error occurs when converting between Rust types and JSON,
    /// typically when preparing portal payloads.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The data portal rejected an operation.
    ///
    /// This error covers persistence-layer failures: invalid payloads,
    /// authorization problems, and API-level `success: false` responses.
    #[error("Portal error: {0}")]
    PortalError(String),

    /// A referenced dataset resource does not exist.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error came from the transport layer.
    ///
    /// The population-level probe relies on this distinction: a transport
    /// failure means "no more levels are published", while any other error
    /// must be surfaced rather than swallowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use codsync_core::error::AppError;
    ///
    /// assert!(AppError::NetworkError("connection reset".to_string()).is_transport());
    /// assert!(AppError::Timeout(30).is_transport());
    /// assert!(!AppError::PortalError("bad payload".to_string()).is_transport());
    /// ```
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::ClientError(_)
                | AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::RateLimitExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::ResourceNotFound("cod-ab-pol: no resource at index 3".to_string());
        assert_eq!(
            err.to_string(),
            "Resource not found: cod-ab-pol: no resource at index 3"
        );
    }

    #[test]
    fn test_generic_error() {
        let err = AppError::Generic("Something went wrong".to_string());
        assert_eq!(err.to_string(), "Error: Something went wrong");
    }

    #[test]
    fn test_timeout_error() {
        let err = AppError::Timeout(30);
        assert_eq!(err.to_string(), "Request timed out after 30 seconds");
    }

    #[test]
    fn test_error_from_serde() {
        let json = "{ invalid json }";
        let result: Result<serde_json::Value, _> = serde_json::from_str(json);
        let serde_err = result.unwrap_err();
        let app_err: AppError = serde_err.into();
        assert!(matches!(app_err, AppError::SerializationError(_)));
    }

    #[test]
    fn test_is_transport() {
        assert!(AppError::ClientError("HTTP 500".to_string()).is_transport());
        assert!(AppError::NetworkError("unreachable".to_string()).is_transport());
        assert!(AppError::Timeout(30).is_transport());
        assert!(AppError::RateLimitExceeded.is_transport());
        assert!(!AppError::PortalError("rejected".to_string()).is_transport());
        assert!(!AppError::InvalidUrl("bad".to_string()).is_transport());
        assert!(!AppError::Generic("other".to_string()).is_transport());
    }
}
