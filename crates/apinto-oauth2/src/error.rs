//! OAuth2 error types.
//!
//! This module defines the error taxonomy shared by the grant, validation and
//! administrative paths. Every failure is surfaced as an [`OAuth2Error`] and
//! converted into a rejection response at the HTTP boundary.

use std::fmt;

/// Errors that can occur while issuing, rotating or validating credentials.
#[derive(Debug, thiserror::Error)]
pub enum OAuth2Error {
    /// No cache backend is available to hold credential state.
    #[error("{message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The request is missing a parameter, uses a disallowed grant type, or
    /// presented the wrong client secret.
    #[error("{message}")]
    Validation {
        /// Description of why the request was rejected.
        message: String,
    },

    /// The authorization code or refresh token is absent, mismatched or
    /// already consumed.
    #[error("{message}")]
    NotFound {
        /// Description of what could not be found.
        message: String,
    },

    /// The access token is past its computed expiry.
    #[error("token expired")]
    Expired,

    /// The stored access token does not match the presented value.
    #[error("invalid token")]
    Mismatch,

    /// The cache backend failed a read or write.
    #[error("{message}")]
    Storage {
        /// Description of the backend failure.
        message: String,
    },

    /// An administrative batch payload could not be decoded or encoded.
    #[error("{message}")]
    Serialization {
        /// Description of the payload problem.
        message: String,
    },
}

impl OAuth2Error {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller is at fault (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::NotFound { .. }
                | Self::Expired
                | Self::Mismatch
                | Self::Serialization { .. }
        )
    }

    /// Returns `true` if the backend or deployment is at fault (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Storage { .. })
    }

    /// Returns `true` if the error came out of bearer token validation.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::Expired | Self::Mismatch)
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::Grant,
            Self::Expired | Self::Mismatch => ErrorCategory::Token,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Serialization { .. } => ErrorCategory::Payload,
        }
    }
}

impl From<serde_json::Error> for OAuth2Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Categories of OAuth2 errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing cache backend.
    Configuration,
    /// Rejected request parameters or client authentication.
    Validation,
    /// Unknown or consumed code/refresh token.
    Grant,
    /// Expired or mismatched access token.
    Token,
    /// Cache backend failures.
    Infrastructure,
    /// Malformed administrative payloads.
    Payload,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::Grant => write!(f, "grant"),
            Self::Token => write!(f, "token"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Payload => write!(f, "payload"),
        }
    }
}
