//! Persistence of refresh token lineages.
//!
//! The rotation engine only talks to [`LineageStore`]. Every mutating
//! operation must be atomic on its own: a cancelled caller leaves either no
//! trace or a complete entry, and content stays unique under concurrency.

pub mod bounded;
pub mod memory;
pub mod redis;

use crate::error::TokenError;
use crate::refresh::lineage::{AccessTokenRef, LineageEntry};
use std::future::Future;
use uuid::Uuid;

pub use self::bounded::BoundedStore;
pub use self::memory::InMemoryLineageStore;
pub use self::redis::RedisLineageStore;

/// Storage interface consumed by the rotation engine (native async, no async-trait crate).
pub trait LineageStore: Send + Sync {
    /// Insert the root entry of a new lineage keyed by `access_token_ref`.
    ///
    /// # Errors
    ///
    /// [`TokenError::ContentConflict`] if `content` is already stored.
    fn create_root_lineage(
        &self,
        content: &str,
        access_token_ref: &AccessTokenRef,
    ) -> impl Future<Output = Result<Uuid, TokenError>> + Send;

    /// Supersede `parent_content`: invalidate every entry of the lineage and
    /// append a new valid child, all in one step.
    ///
    /// The parent must still be valid when the write happens, so of two
    /// callers rotating the same entry at most one succeeds, whether or not
    /// they share a process.
    ///
    /// # Errors
    ///
    /// - [`TokenError::LineageNotFound`] if no entry carries `access_token_ref`
    ///   or the parent is not part of that lineage.
    /// - [`TokenError::LineageRevoked`] if the parent is no longer valid.
    /// - [`TokenError::ContentConflict`] if `content` is already stored.
    fn create_child_lineage(
        &self,
        parent_content: &str,
        content: &str,
        access_token_ref: &AccessTokenRef,
        paired_access_ref: &AccessTokenRef,
    ) -> impl Future<Output = Result<Uuid, TokenError>> + Send;

    /// Look up an entry by its refresh token content.
    fn find_by_content(
        &self,
        content: &str,
    ) -> impl Future<Output = Result<Option<LineageEntry>, TokenError>> + Send;

    /// Look up the entry minted together with the given access token.
    fn find_by_access_token(
        &self,
        paired_access_ref: &AccessTokenRef,
    ) -> impl Future<Output = Result<Option<LineageEntry>, TokenError>> + Send;

    /// Clear the validity flag on every entry of the lineage.
    ///
    /// Returns how many entries went from valid to invalid; repeating the call returns 0.
    fn invalidate_lineage(
        &self,
        access_token_ref: &AccessTokenRef,
    ) -> impl Future<Output = Result<u64, TokenError>> + Send;
}
