//! Keyed digest over the raw header and claims bytes.

use ring::hmac;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// HMAC-SHA256 signer keyed by the shared service secret.
#[derive(Clone)]
pub struct HmacSigner {
    key: hmac::Key,
}

impl HmacSigner {
    /// Signer keyed with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.expose_secret().as_bytes()),
        }
    }

    /// Digest over `header ‖ claims`.
    #[must_use]
    pub fn sign(&self, header: &[u8], claims: &[u8]) -> Vec<u8> {
        let mut context = hmac::Context::with_key(&self.key);
        context.update(header);
        context.update(claims);
        context.sign().as_ref().to_vec()
    }

    /// Constant-time comparison of an encoded signature against the expected one.
    #[must_use]
    pub fn matches(expected: &str, presented: &str) -> bool {
        expected.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}
