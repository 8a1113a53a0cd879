//! Lineage entries and access token references.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Stored reference to an access token: base64url SHA-256 of the token text.
///
/// Lineage entries never hold raw bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessTokenRef(String);

impl AccessTokenRef {
    /// Reference for `access_token`.
    pub fn of(access_token: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(Sha256::digest(access_token.as_bytes())))
    }

    /// Encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One refresh token in a lineage.
///
/// All entries sharing `access_token_ref` form one lineage; the first is the
/// root. `paired_access_ref` names the access token minted together with this
/// entry and is what a renewal request must present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEntry {
    /// Entry id
    pub id: Uuid,
    /// Refresh token text
    pub content: String,
    /// Lineage key: the access token the root was issued with
    pub access_token_ref: AccessTokenRef,
    /// Access token minted together with this entry
    pub paired_access_ref: AccessTokenRef,
    /// Cleared when superseded or revoked; never set again
    pub valid: bool,
    /// Unix seconds
    pub created_at: i64,
}

impl LineageEntry {
    /// First entry of a new lineage.
    pub fn root(content: String, access_token_ref: AccessTokenRef, created_at: i64) -> Self {
        LineageEntry {
            id: Uuid::new_v4(),
            content,
            paired_access_ref: access_token_ref.clone(),
            access_token_ref,
            valid: true,
            created_at,
        }
    }

    /// Successor entry in an existing lineage.
    pub fn child(
        content: String,
        access_token_ref: AccessTokenRef,
        paired_access_ref: AccessTokenRef,
        created_at: i64,
    ) -> Self {
        LineageEntry {
            id: Uuid::new_v4(),
            content,
            access_token_ref,
            paired_access_ref,
            valid: true,
            created_at,
        }
    }

    /// Whether this entry opened its lineage.
    pub fn is_root(&self) -> bool {
        self.access_token_ref == self.paired_access_ref
    }

    /// Clear the validity flag. Returns whether it was set before.
    pub fn invalidate(&mut self) -> bool {
        std::mem::replace(&mut self.valid, false)
    }

    /// Whether `access` is the token minted with this entry.
    pub fn is_paired_with(&self, access: &AccessTokenRef) -> bool {
        &self.paired_access_ref == access
    }
}
