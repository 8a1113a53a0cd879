//! Sign-in, refresh, current-subject and sign-out flows.

use crate::error::TokenError;
use crate::gate::{bearer_token, AccessGate, GatePolicy};
use crate::identity::{CredentialAuthority, SubjectProfile};
use crate::jwt::ClaimsBuilder;
use crate::refresh::{RotationEngine, TokenPair};
use crate::storage::LineageStore;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// `token_type` of every response.
pub const TOKEN_TYPE: &str = "Bearer";

/// Token endpoint response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed access token
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token to present on renewal
    pub refresh_token: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        TokenResponse {
            access_token: pair.access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: pair.expires_in,
            refresh_token: pair.refresh_token,
        }
    }
}

/// Sign-in, refresh, current-subject and sign-out flows.
pub struct SessionService<S, A> {
    engine: Arc<RotationEngine<S>>,
    authority: Arc<A>,
    strict: AccessGate,
    lenient: AccessGate,
    issuer: String,
    audience: String,
}

impl<S: LineageStore, A: CredentialAuthority> SessionService<S, A> {
    /// Session flows over `engine` and `authority`, issuing for `issuer` and `audience`.
    pub fn new(
        engine: Arc<RotationEngine<S>>,
        authority: Arc<A>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        let codec = engine.codec().clone();
        SessionService {
            strict: AccessGate::new(codec.clone(), GatePolicy::Strict),
            lenient: AccessGate::new(codec, GatePolicy::Lenient),
            engine,
            authority,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Underlying rotation engine.
    pub fn engine(&self) -> &RotationEngine<S> {
        &self.engine
    }

    /// Authenticate credentials and issue a new token pair.
    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, TokenError> {
        let subject = self
            .authority
            .authenticate_credentials(identifier, password)
            .await?;

        let claims = ClaimsBuilder::new(self.issuer.as_str())
            .subject(subject.as_str())
            .audience(self.audience.as_str())
            .build()?;

        let pair = self.engine.issue(claims).await?;
        info!(subject = %subject, "signed in");
        Ok(pair.into())
    }

    /// Rotate the pair whose access token is in `authorization`.
    pub async fn refresh(
        &self,
        authorization: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, TokenError> {
        let access_token = bearer_token(authorization)?;
        let pair = self.engine.renew(refresh_token, access_token).await?;
        Ok(pair.into())
    }

    /// Profile of the subject named by a live bearer token.
    pub async fn current_subject(&self, authorization: &str) -> Result<SubjectProfile, TokenError> {
        self.current_subject_at(authorization, chrono::Utc::now().timestamp())
            .await
    }

    /// Resolve the subject of a live access token.
    pub async fn current_subject_at(
        &self,
        authorization: &str,
        now: i64,
    ) -> Result<SubjectProfile, TokenError> {
        let claims = self.strict.authorize(authorization, now)?;
        let subject = claims.subject().ok_or(TokenError::SubjectNotFound)?;
        self.authority.lookup_subject(subject).await
    }

    /// Revoke the lineage of the presented access token. Expired tokens are accepted.
    ///
    /// Returns the number of refresh entries invalidated.
    pub async fn sign_out(&self, authorization: &str) -> Result<u64, TokenError> {
        let claims = self.lenient.authorize(authorization, 0)?;
        let access_token = bearer_token(authorization)?;

        let revoked = self.engine.revoke(access_token).await?;
        info!(subject = claims.subject(), revoked, "signed out");
        Ok(revoked)
    }
}
