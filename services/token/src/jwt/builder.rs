//! Fluent construction of access token claims.

use crate::error::TokenError;
use crate::jwt::claims::Claims;
use std::collections::BTreeMap;

/// Builds access token claims from the configured issuer and audience.
pub struct ClaimsBuilder {
    issuer: String,
    audience: Option<String>,
    subject: Option<String>,
    scope: Option<String>,
    lifetime: Option<(i64, i64)>,
    custom_claims: BTreeMap<String, String>,
}

impl ClaimsBuilder {
    /// Start a builder for tokens issued by `issuer`.
    pub fn new(issuer: impl Into<String>) -> Self {
        ClaimsBuilder {
            issuer: issuer.into(),
            audience: None,
            subject: None,
            scope: None,
            lifetime: None,
            custom_claims: BTreeMap::new(),
        }
    }

    /// Set the `sub` claim.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the `aud` claim.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the `scope` claim.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Stamp `iat = now` and `exp = now + ttl_seconds`.
    pub fn lifetime(mut self, now: i64, ttl_seconds: i64) -> Self {
        self.lifetime = Some((now, ttl_seconds));
        self
    }

    /// Add a non-reserved claim. Reserved keys set elsewhere take precedence.
    pub fn custom_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_claims.insert(key.into(), value.into());
        self
    }

    /// Build the claims. Without [`lifetime`](Self::lifetime) no `iat`/`exp` is set.
    pub fn build(self) -> Result<Claims, TokenError> {
        let subject = self
            .subject
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TokenError::internal("subject is required"))?;

        // custom claims first so reserved keys always win
        let mut claims = Claims::from(self.custom_claims)
            .with_issuer(self.issuer)
            .with_subject(subject);

        if let Some(audience) = self.audience {
            claims = claims.with_audience(audience);
        }

        if let Some(scope) = self.scope {
            claims = claims.with_scope(scope);
        }

        if let Some((now, ttl_seconds)) = self.lifetime {
            claims.stamp_lifetime(now, ttl_seconds);
        }

        Ok(claims)
    }
}
