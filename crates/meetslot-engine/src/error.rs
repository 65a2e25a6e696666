//! Error types for scheduling-engine operations.
//!
//! Every failure the engine surfaces carries an [`EngineErrorCode`]
//! classification that drives retry behavior: transient remote failures
//! (429, 5xx, network-level) are retryable, everything else propagates
//! immediately. The originating HTTP status, when there is one, is kept on
//! the error so callers can still inspect it after retries are exhausted.

use std::fmt;
use thiserror::Error;

/// The category of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineErrorCode {
    /// Authorization-code exchange succeeded at the transport level but
    /// returned no refresh credential.
    AuthExchangeFailed,
    /// No usable credential exists for the user.
    NotAuthorized,
    /// Authentication with the remote failed - credentials invalid/expired.
    AuthenticationFailed,
    /// Authorization failed - state mismatch or missing permission.
    AuthorizationFailed,
    /// Malformed or logically inconsistent caller input; never sent to the
    /// remote API.
    Validation,
    /// Network error - connection failed, timeout, DNS resolution.
    NetworkError,
    /// Rate limit exceeded (429).
    RateLimited,
    /// Server returned a 5xx status.
    ServerError,
    /// Invalid response from the server - parse error, missing fields.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was invalid (other 4xx).
    BadRequest,
    /// A stored credential failed decryption or authentication.
    CredentialCorrupted,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// Internal engine error - unexpected state, bug.
    InternalError,
}

impl EngineErrorCode {
    /// Returns true if this error is transient and the operation may be
    /// retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthExchangeFailed => "auth_exchange_failed",
            Self::NotAuthorized => "not_authorized",
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::Validation => "validation",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::CredentialCorrupted => "credential_corrupted",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from a scheduling-engine operation.
#[derive(Debug, Error)]
pub struct EngineError {
    /// The error code categorizing this error.
    code: EngineErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The HTTP status of the failing remote call, if any.
    status: Option<u16>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    /// Creates a new engine error with the given code and message.
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates an auth-exchange error (no refresh credential issued).
    pub fn auth_exchange(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::AuthExchangeFailed, message)
    }

    /// Creates a not-authorized error (no usable credential for the user).
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::NotAuthorized, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::AuthorizationFailed, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::Validation, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::RateLimited, message).with_status(429)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::BadRequest, message)
    }

    /// Creates a corrupted-credential error.
    pub fn credential_corrupted(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::CredentialCorrupted, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EngineErrorCode::InternalError, message)
    }

    /// Sets the HTTP status for this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> EngineErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status of the failing remote call, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (status {})", status)?;
        }
        Ok(())
    }
}

/// A specialized Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(EngineErrorCode::NetworkError.is_retryable());
        assert!(EngineErrorCode::RateLimited.is_retryable());
        assert!(EngineErrorCode::ServerError.is_retryable());
        assert!(!EngineErrorCode::AuthExchangeFailed.is_retryable());
        assert!(!EngineErrorCode::NotAuthorized.is_retryable());
        assert!(!EngineErrorCode::Validation.is_retryable());
        assert!(!EngineErrorCode::BadRequest.is_retryable());
        assert!(!EngineErrorCode::CredentialCorrupted.is_retryable());
    }

    #[test]
    fn engine_error_creation() {
        let err = EngineError::not_authorized("no credential for user");
        assert_eq!(err.code(), EngineErrorCode::NotAuthorized);
        assert_eq!(err.message(), "no credential for user");
        assert!(err.status().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limited_carries_status() {
        let err = EngineError::rate_limited("too many requests");
        assert_eq!(err.status(), Some(429));
        assert!(err.is_retryable());
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::server("upstream exploded").with_status(503);
        let display = format!("{}", err);
        assert!(display.contains("server_error"));
        assert!(display.contains("upstream exploded"));
        assert!(display.contains("503"));
    }

    #[test]
    fn engine_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = EngineError::internal("failed to persist").with_source(io_err);
        assert!(err.source().is_some());
    }
}
