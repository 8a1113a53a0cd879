//! Issuing and rotating token pairs.

use crate::error::TokenError;
use crate::jwt::claims::{self, Claims};
use crate::jwt::TokenCodec;
use crate::metrics;
use crate::refresh::generator::RefreshTokenGenerator;
use crate::refresh::lineage::AccessTokenRef;
use crate::refresh::locks::LineageLocks;
use crate::storage::LineageStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifetimes of minted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        RotationPolicy {
            access_ttl: Duration::from_secs(60),
            refresh_ttl: Duration::from_secs(86_400),
        }
    }
}

impl RotationPolicy {
    /// Reject lifetimes that would truncate to zero whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if either TTL is shorter than a second.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.access_ttl_secs() < 1 || self.refresh_ttl_secs() < 1 {
            return Err(TokenError::config("token TTLs must be at least one second"));
        }
        Ok(())
    }

    /// Access token lifetime in whole seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        seconds(self.access_ttl)
    }

    /// Refresh token lifetime in whole seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        seconds(self.refresh_ttl)
    }
}

fn seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

/// Freshly minted access token and the refresh token bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token
    pub access_token: String,
    /// Refresh token bound to `access_token`
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Issues token pairs and rotates refresh lineages.
///
/// A lineage starts with [`issue`](Self::issue) and advances one entry per
/// successful [`renew`](Self::renew). Any renewal that presents a superseded,
/// mismatched, expired or forged credential revokes the whole lineage.
pub struct RotationEngine<S> {
    codec: TokenCodec,
    store: Arc<S>,
    policy: RotationPolicy,
    locks: LineageLocks,
}

impl<S: LineageStore> RotationEngine<S> {
    /// Build an engine over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if `policy` has a sub-second TTL.
    pub fn new(
        codec: TokenCodec,
        store: Arc<S>,
        policy: RotationPolicy,
    ) -> Result<Self, TokenError> {
        policy.validate()?;
        Ok(RotationEngine {
            codec,
            store,
            policy,
            locks: LineageLocks::new(),
        })
    }

    /// Codec used for both token kinds.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Underlying lineage store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Lifetimes applied to minted tokens.
    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    /// Mint a pair at the current time. See [`issue_at`](Self::issue_at).
    pub async fn issue(&self, claims: Claims) -> Result<TokenPair, TokenError> {
        self.issue_at(claims, chrono::Utc::now().timestamp()).await
    }

    /// Mint a token pair and open a new lineage for it.
    pub async fn issue_at(&self, claims: Claims, now: i64) -> Result<TokenPair, TokenError> {
        let subject = claims.subject().map(str::to_owned);
        let access_token = self.mint_access(claims, now)?;
        let refresh_token =
            RefreshTokenGenerator::generate(&self.codec, now, self.policy.refresh_ttl_secs())?;

        let lineage = AccessTokenRef::of(&access_token);
        let id = self.store.create_root_lineage(&refresh_token, &lineage).await?;

        metrics::record_token_issued("access");
        metrics::record_token_issued("refresh");
        info!(%lineage, %id, subject = subject.as_deref(), "issued token pair");

        Ok(self.pair(access_token, refresh_token))
    }

    /// Renew at the current time. See [`renew_at`](Self::renew_at).
    pub async fn renew(&self, refresh_token: &str, access_token: &str) -> Result<TokenPair, TokenError> {
        self.renew_at(refresh_token, access_token, chrono::Utc::now().timestamp())
            .await
    }

    /// Exchange a refresh token and the access token it was issued with for a new pair.
    ///
    /// # Errors
    ///
    /// - [`TokenError::LineageNotFound`] when the refresh token is unknown. If the
    ///   access token belongs to a lineage, that lineage is revoked.
    /// - [`TokenError::LineageMismatch`], [`TokenError::LineageRevoked`],
    ///   [`TokenError::RefreshExpired`] or a codec error; the lineage is revoked.
    /// - [`TokenError::StoreUnavailable`] when the store fails; nothing is revoked.
    pub async fn renew_at(
        &self,
        refresh_token: &str,
        access_token: &str,
        now: i64,
    ) -> Result<TokenPair, TokenError> {
        let presented = AccessTokenRef::of(access_token);

        let Some(entry) = self.store.find_by_content(refresh_token).await? else {
            return Err(self.reject_unknown(&presented).await);
        };

        let lineage = entry.access_token_ref;
        let _guard = self.locks.acquire(&lineage).await;

        match self
            .rotate(refresh_token, access_token, &presented, &lineage, now)
            .await
        {
            Ok((pair, id)) => {
                metrics::record_token_renewed("success");
                info!(%lineage, %id, "rotated refresh token");
                Ok(pair)
            }
            Err(err) => Err(self.fail(&lineage, err).await),
        }
    }

    /// Revoke the lineage that `access_token` was issued in.
    ///
    /// Returns the number of entries invalidated; unknown tokens yield 0.
    pub async fn revoke(&self, access_token: &str) -> Result<u64, TokenError> {
        match self
            .store
            .find_by_access_token(&AccessTokenRef::of(access_token))
            .await?
        {
            Some(entry) => self.revoke_lineage(&entry.access_token_ref).await,
            None => Ok(0),
        }
    }

    /// Invalidate every entry of `lineage`.
    pub async fn revoke_lineage(&self, lineage: &AccessTokenRef) -> Result<u64, TokenError> {
        let revoked = self.store.invalidate_lineage(lineage).await?;
        if revoked > 0 {
            metrics::record_lineage_revoked("sign_out");
            info!(%lineage, revoked, "revoked refresh lineage");
        }
        Ok(revoked)
    }

    /// Checks and mints under the lineage lock. The entry is re-read so a
    /// concurrent rotation that finished first is observed.
    async fn rotate(
        &self,
        refresh_token: &str,
        access_token: &str,
        presented: &AccessTokenRef,
        lineage: &AccessTokenRef,
        now: i64,
    ) -> Result<(TokenPair, Uuid), TokenError> {
        let entry = self
            .store
            .find_by_content(refresh_token)
            .await?
            .ok_or(TokenError::LineageNotFound)?;

        if !entry.is_paired_with(presented) {
            return Err(TokenError::LineageMismatch);
        }
        if !entry.valid {
            return Err(TokenError::LineageRevoked);
        }

        RefreshTokenGenerator::validate(&self.codec, refresh_token, now)?;
        let claims = self.codec.verify(access_token)?;

        let new_access = self.mint_access(claims, now)?;
        let new_refresh =
            RefreshTokenGenerator::generate(&self.codec, now, self.policy.refresh_ttl_secs())?;

        let id = self
            .store
            .create_child_lineage(
                refresh_token,
                &new_refresh,
                lineage,
                &AccessTokenRef::of(&new_access),
            )
            .await?;

        Ok((self.pair(new_access, new_refresh), id))
    }

    async fn reject_unknown(&self, presented: &AccessTokenRef) -> TokenError {
        metrics::record_token_renewed(TokenError::LineageNotFound.code());

        match self.store.find_by_access_token(presented).await {
            Ok(Some(entry)) => {
                self.revoke_for(&entry.access_token_ref, &TokenError::LineageNotFound)
                    .await;
                TokenError::LineageNotFound
            }
            Ok(None) => TokenError::LineageNotFound,
            Err(err) => err,
        }
    }

    async fn fail(&self, lineage: &AccessTokenRef, err: TokenError) -> TokenError {
        metrics::record_token_renewed(err.code());

        if err.revokes_lineage() {
            self.revoke_for(lineage, &err).await;
        } else {
            warn!(%lineage, error = %err, "refresh rotation failed");
        }
        err
    }

    async fn revoke_for(&self, lineage: &AccessTokenRef, cause: &TokenError) {
        if matches!(cause, TokenError::LineageRevoked) {
            metrics::record_security_event("REFRESH_REUSE");
        }

        match self.store.invalidate_lineage(lineage).await {
            Ok(revoked) => {
                metrics::record_lineage_revoked(cause.code());
                warn!(%lineage, revoked, reason = cause.code(), "revoked refresh lineage");
            }
            Err(err) => {
                warn!(%lineage, reason = cause.code(), error = %err, "failed to revoke refresh lineage");
            }
        }
    }

    fn mint_access(&self, mut claims: Claims, now: i64) -> Result<String, TokenError> {
        claims.stamp_lifetime(now, self.policy.access_ttl_secs());
        claims.insert(claims::JTI, Uuid::new_v4().to_string());
        self.codec.issue(&claims)
    }

    fn pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            expires_in: self.policy.access_ttl_secs(),
        }
    }
}
