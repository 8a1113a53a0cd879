//! Compact three-segment signed token codec.
//!
//! Token layout: `base64(header-json).base64(claims-json).base64(digest)`,
//! where the digest is HMAC-SHA256 over the concatenated raw JSON bytes of
//! the header and claims. The digest does not cover the encoded segments;
//! tokens already in circulation depend on that.
//!
//! Verification and expiry are separate steps so that a caller can accept a
//! correctly signed but expired token, which is exactly what renewal needs.

use crate::error::TokenError;
use crate::jwt::claims::Claims;
use crate::jwt::serializer::JwtSerializer;
use crate::jwt::signer::HmacSigner;
use secrecy::SecretString;
use tracing::debug;

/// Issues and verifies HMAC-SHA256 bearer tokens.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    signer: HmacSigner,
}

impl TokenCodec {
    /// Codec signing with `secret`.
    pub fn new(secret: &SecretString) -> Self {
        Self {
            signer: HmacSigner::new(secret),
        }
    }

    /// Serialize and sign `claims`.
    pub fn issue(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = JwtSerializer::header_json()?;
        let payload = JwtSerializer::claims_json(claims)?;
        let signature = self.signer.sign(&header, &payload);

        Ok(format!(
            "{}.{}.{}",
            JwtSerializer::encode_segment(&header),
            JwtSerializer::encode_segment(&payload),
            JwtSerializer::encode_segment(&signature),
        ))
    }

    /// Check structure and signature and return the claims. Expiry is not checked.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let [header_segment, payload_segment, signature_segment] = JwtSerializer::split(token)?;
        let header = JwtSerializer::decode_segment(header_segment, "header")?;
        let payload = JwtSerializer::decode_segment(payload_segment, "payload")?;

        let expected = JwtSerializer::encode_segment(&self.signer.sign(&header, &payload));
        if !HmacSigner::matches(&expected, signature_segment) {
            debug!("token signature mismatch");
            return Err(TokenError::BadSignature);
        }

        JwtSerializer::parse_header(&header)?;
        JwtSerializer::parse_claims(&payload)
    }

    /// Strict policy: signature, structure and expiry.
    pub fn verify_unexpired(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        Self::check_expiry(&claims, now)?;
        Ok(claims)
    }

    /// A token without `exp` never expires; otherwise it is expired once `now > exp`.
    pub fn check_expiry(claims: &Claims, now: i64) -> Result<(), TokenError> {
        let Some(raw) = claims.expires_at() else {
            return Ok(());
        };

        let exp: i64 = raw
            .parse()
            .map_err(|_| TokenError::MalformedExpiry(raw.to_string()))?;

        if now > exp {
            return Err(TokenError::Expired);
        }

        Ok(())
    }

    /// Decode the claims without checking the signature.
    ///
    /// Only for tokens that already passed [`TokenCodec::verify`] elsewhere;
    /// never base an authorization decision on the result.
    pub fn extract_claims(token: &str) -> Result<Claims, TokenError> {
        let [_, payload_segment, _] = JwtSerializer::split(token)?;
        let payload = JwtSerializer::decode_segment(payload_segment, "payload")?;
        JwtSerializer::parse_claims(&payload)
    }
}
