//! Error taxonomy for token issuance, verification and refresh rotation.
//!
//! Callers map errors to responses through [`TokenError::public_message`]:
//! structural and signature failures share one message, and every refresh
//! rejection shares another, so a client cannot learn which check failed.

use rust_common::PlatformError;
use thiserror::Error;

/// Token service error.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TokenError {
    /// Structural decode failure (segments, base64, JSON, header).
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Signature does not match the token content.
    #[error("Token signature invalid")]
    BadSignature,

    /// Signature is valid but the token is past its `exp`.
    #[error("Token expired")]
    Expired,

    /// The `exp` claim is present but not a base-10 integer.
    #[error("Malformed expiry claim: {0:?}")]
    MalformedExpiry(String),

    /// Presented refresh token is unknown to the store.
    #[error("Invalid refresh token")]
    LineageNotFound,

    /// Refresh token was not minted together with the presented access token.
    #[error("Invalid refresh token")]
    LineageMismatch,

    /// Refresh token was already superseded or its lineage was revoked.
    #[error("Invalid refresh token")]
    LineageRevoked,

    /// Refresh token is past its own expiry.
    #[error("Invalid refresh token")]
    RefreshExpired,

    /// Another lineage entry already holds this refresh token content.
    #[error("Refresh token content already exists")]
    ContentConflict,

    /// No bearer credentials were presented.
    #[error("Authorization header required")]
    AuthorizationMissing,

    /// Authorization value is not `Bearer <token>`.
    #[error("Invalid authorization header")]
    AuthorizationMalformed,

    /// Identifier/secret pair was rejected by the credential authority.
    #[error("Identifier or password does not exist or match")]
    InvalidCredentials,

    /// Token subject has no matching record.
    #[error("Subject not found")]
    SubjectNotFound,

    /// Backing store failed or timed out. Retryable.
    #[error("Token store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Create a malformed token error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken(reason.into())
    }

    /// Create a store unavailable error.
    #[must_use]
    pub fn store(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable(reason.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => TOKEN_MALFORMED,
            Self::BadSignature => TOKEN_BAD_SIGNATURE,
            Self::Expired => TOKEN_EXPIRED,
            Self::MalformedExpiry(_) => TOKEN_MALFORMED_EXPIRY,
            Self::LineageNotFound => TOKEN_REFRESH_NOT_FOUND,
            Self::LineageMismatch => TOKEN_REFRESH_MISMATCH,
            Self::LineageRevoked => TOKEN_REFRESH_REUSED,
            Self::RefreshExpired => TOKEN_REFRESH_EXPIRED,
            Self::ContentConflict => TOKEN_CONTENT_CONFLICT,
            Self::AuthorizationMissing => AUTH_HEADER_MISSING,
            Self::AuthorizationMalformed => AUTH_HEADER_MALFORMED,
            Self::InvalidCredentials => AUTH_INVALID_CREDENTIALS,
            Self::SubjectNotFound => AUTH_SUBJECT_NOT_FOUND,
            Self::StoreUnavailable(_) => TOKEN_STORE_UNAVAILABLE,
            Self::Config(_) => CONFIG_ERROR,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Whether this failure during renewal revokes the lineage involved.
    ///
    /// Transient and internal failures never revoke: they say nothing about
    /// the credentials that were presented.
    #[must_use]
    pub const fn revokes_lineage(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken(_)
                | Self::BadSignature
                | Self::Expired
                | Self::MalformedExpiry(_)
                | Self::LineageNotFound
                | Self::LineageMismatch
                | Self::LineageRevoked
                | Self::RefreshExpired
        )
    }

    /// Whether the error belongs to the refresh rejection family.
    #[must_use]
    pub const fn is_refresh_rejection(&self) -> bool {
        matches!(
            self,
            Self::LineageNotFound | Self::LineageMismatch | Self::LineageRevoked | Self::RefreshExpired
        )
    }

    /// Whether the error is a 401-class authentication failure.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        !matches!(
            self,
            Self::StoreUnavailable(_) | Self::ContentConflict | Self::Config(_) | Self::Internal(_)
        )
    }

    /// Sanitized message safe to return to clients.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) | Self::BadSignature | Self::MalformedExpiry(_) => {
                "invalid token"
            }
            Self::Expired => "token expired",
            Self::LineageNotFound
            | Self::LineageMismatch
            | Self::LineageRevoked
            | Self::RefreshExpired => "invalid refresh token",
            Self::AuthorizationMissing => "authorization header required",
            Self::AuthorizationMalformed => "invalid authorization header",
            Self::InvalidCredentials => "identifier or password does not exist or match",
            Self::SubjectNotFound => "unable to get subject",
            Self::StoreUnavailable(_) => "service temporarily unavailable",
            Self::ContentConflict | Self::Config(_) | Self::Internal(_) => {
                "internal server error"
            }
        }
    }
}

impl From<redis::RedisError> for TokenError {
    fn from(err: redis::RedisError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {err}"))
    }
}

impl From<PlatformError> for TokenError {
    fn from(err: PlatformError) -> Self {
        if err.is_retryable() {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

// Error codes for API responses
/// Token could not be parsed.
pub const TOKEN_MALFORMED: &str = "TOKEN_MALFORMED";
/// Signature did not match.
pub const TOKEN_BAD_SIGNATURE: &str = "TOKEN_BAD_SIGNATURE";
/// Token is past its expiry.
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
/// `exp` claim is not a timestamp.
pub const TOKEN_MALFORMED_EXPIRY: &str = "TOKEN_MALFORMED_EXPIRY";
/// Refresh token is unknown.
pub const TOKEN_REFRESH_NOT_FOUND: &str = "TOKEN_REFRESH_NOT_FOUND";
/// Refresh token presented with the wrong access token.
pub const TOKEN_REFRESH_MISMATCH: &str = "TOKEN_REFRESH_MISMATCH";
/// Refresh token was already superseded or revoked.
pub const TOKEN_REFRESH_REUSED: &str = "TOKEN_REFRESH_REUSED";
/// Refresh token is past its expiry.
pub const TOKEN_REFRESH_EXPIRED: &str = "TOKEN_REFRESH_EXPIRED";
/// Refresh token content collided with a stored entry.
pub const TOKEN_CONTENT_CONFLICT: &str = "TOKEN_CONTENT_CONFLICT";
/// Lineage store failed or timed out.
pub const TOKEN_STORE_UNAVAILABLE: &str = "TOKEN_STORE_UNAVAILABLE";
/// No `Authorization` header.
pub const AUTH_HEADER_MISSING: &str = "AUTH_HEADER_MISSING";
/// `Authorization` header is not `Bearer <token>`.
pub const AUTH_HEADER_MALFORMED: &str = "AUTH_HEADER_MALFORMED";
/// Sign-in credentials were rejected.
pub const AUTH_INVALID_CREDENTIALS: &str = "AUTH_INVALID_CREDENTIALS";
/// Token subject no longer exists.
pub const AUTH_SUBJECT_NOT_FOUND: &str = "AUTH_SUBJECT_NOT_FOUND";
/// Invalid configuration.
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
/// Unexpected internal failure.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
