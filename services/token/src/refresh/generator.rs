//! Refresh token content.

use crate::error::TokenError;
use crate::jwt::claims::{self, Claims};
use crate::jwt::TokenCodec;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

/// Claim carrying the random part of a refresh token.
pub const REF: &str = "ref";
/// Scope value marking a refresh token.
pub const REFRESH_SCOPE: &str = "refresh";

/// Mints and validates refresh token content.
pub struct RefreshTokenGenerator;

impl RefreshTokenGenerator {
    /// 32 random bytes, base64url encoded.
    pub fn random_ref() -> String {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        URL_SAFE_NO_PAD.encode(&bytes[..])
    }

    /// Mint refresh token content: a signed token with its own expiry and a random reference.
    pub fn generate(codec: &TokenCodec, now: i64, ttl_seconds: i64) -> Result<String, TokenError> {
        let claims = Claims::new()
            .with(REF, Self::random_ref())
            .with(claims::SCOPE, REFRESH_SCOPE)
            .with_expiry(now.saturating_add(ttl_seconds));

        codec.issue(&claims)
    }

    /// Check a presented refresh token's signature, scope and expiry.
    pub fn validate(codec: &TokenCodec, content: &str, now: i64) -> Result<Claims, TokenError> {
        let claims = codec.verify(content)?;

        if claims.scope() != Some(REFRESH_SCOPE) || !claims.contains(REF) {
            return Err(TokenError::malformed("not a refresh token"));
        }

        TokenCodec::check_expiry(&claims, now).map_err(|err| match err {
            TokenError::Expired => TokenError::RefreshExpired,
            other => other,
        })?;

        Ok(claims)
    }
}
