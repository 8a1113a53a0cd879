//! Bearer access checks for protected operations.
//!
//! The gate parses an `Authorization` header value and verifies the token it
//! carries. Transport concerns (status codes, response bodies) belong to the
//! caller; [`TokenError::public_message`] gives the client-facing text.

use crate::error::TokenError;
use crate::jwt::{Claims, TokenCodec};
use tracing::debug;

/// How much of a token's validity the gate insists on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePolicy {
    /// Signature and expiry.
    #[default]
    Strict,
    /// Signature only. For sign-out and renewal, where an expired token is still meaningful.
    Lenient,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The value must be exactly two space-separated parts and the scheme is
/// matched case-insensitively.
pub fn bearer_token(header: &str) -> Result<&str, TokenError> {
    if header.is_empty() {
        return Err(TokenError::AuthorizationMissing);
    }

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(TokenError::AuthorizationMalformed),
    }
}

/// Verifies bearer tokens from `Authorization` headers.
#[derive(Debug, Clone)]
pub struct AccessGate {
    codec: TokenCodec,
    policy: GatePolicy,
}

impl AccessGate {
    /// Gate verifying with `codec` under `policy`.
    pub fn new(codec: TokenCodec, policy: GatePolicy) -> Self {
        Self { codec, policy }
    }

    /// Whether expiry is enforced.
    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Verify the bearer token in `header` and return its claims.
    pub fn authorize(&self, header: &str, now: i64) -> Result<Claims, TokenError> {
        let token = bearer_token(header)?;

        let claims = match self.policy {
            GatePolicy::Strict => self.codec.verify_unexpired(token, now),
            GatePolicy::Lenient => self.codec.verify(token),
        }
        .map_err(|err| {
            debug!(code = err.code(), "bearer token rejected");
            err
        })?;

        Ok(claims)
    }
}
