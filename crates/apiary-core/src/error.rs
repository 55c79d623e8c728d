//! Error types for the console core
//!
//! Provides the taxonomy every network call is mapped into:
//! - Missing or expired credentials
//! - Server-side permission refusals
//! - Validation and conflict responses
//! - Transport and decoding failures

/// Errors produced by calls against the fleet backend.
///
/// Every call site converts one of these into a scoped, user-visible
/// notice; none of them may propagate into the view router.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No credential is present for an authenticated call
    #[error("authentication required")]
    AuthRequired,

    /// The backend answered 401; the session must be cleared
    #[error("session expired")]
    AuthExpired,

    /// The backend refused the operation (403)
    #[error("operation not permitted: {0}")]
    PermissionDenied(String),

    /// The request was rejected as invalid (400/422)
    #[error("validation failed: {0}")]
    Validation(String),

    /// The stored state no longer matches the submitted baseline (409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The entity does not exist (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),

    /// Any other server-side failure
    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },
}

impl ApiError {
    /// Map an HTTP status plus the server-provided detail message.
    #[inline]
    #[must_use]
    pub fn from_status(status: u16, detail: String) -> Self {
        match status {
            400 | 422 => Self::Validation(detail),
            401 => Self::AuthExpired,
            403 => Self::PermissionDenied(detail),
            404 => Self::NotFound(detail),
            409 => Self::Conflict(detail),
            _ => Self::Server { status, detail },
        }
    }

    /// Check whether the error ends the session
    #[inline]
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Check whether the error is a version conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check whether retrying the same call later could succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for the expected shape
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
