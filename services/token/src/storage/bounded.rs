//! Deadline decorator for lineage stores.
//!
//! No store call may hang a request: each operation runs under
//! `tokio::time::timeout` and an elapsed deadline surfaces as
//! [`TokenError::StoreUnavailable`].

use crate::error::TokenError;
use crate::metrics;
use crate::refresh::lineage::{AccessTokenRef, LineageEntry};
use crate::storage::LineageStore;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

/// Wraps a store and bounds every call by `limit`.
pub struct BoundedStore<S> {
    inner: S,
    limit: Duration,
}

impl<S: LineageStore> BoundedStore<S> {
    /// Bound every call to `inner` by `limit`.
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// Wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Per-call deadline.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, TokenError>>,
    ) -> Result<T, TokenError> {
        let started = Instant::now();
        let outcome = timeout(self.limit, call).await;
        metrics::record_store_latency(operation, started.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => {
                metrics::record_store_operation(
                    operation,
                    if result.is_ok() { "ok" } else { "error" },
                );
                result
            }
            Err(_) => {
                metrics::record_store_operation(operation, "timeout");
                warn!(operation, limit = ?self.limit, "token store call timed out");
                Err(TokenError::store(format!(
                    "{operation} timed out after {:?}",
                    self.limit
                )))
            }
        }
    }
}

impl<S: LineageStore> LineageStore for BoundedStore<S> {
    async fn create_root_lineage(
        &self,
        content: &str,
        access_token_ref: &AccessTokenRef,
    ) -> Result<Uuid, TokenError> {
        self.bounded(
            "create_root_lineage",
            self.inner.create_root_lineage(content, access_token_ref),
        )
        .await
    }

    async fn create_child_lineage(
        &self,
        parent_content: &str,
        content: &str,
        access_token_ref: &AccessTokenRef,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Uuid, TokenError> {
        self.bounded(
            "create_child_lineage",
            self.inner.create_child_lineage(
                parent_content,
                content,
                access_token_ref,
                paired_access_ref,
            ),
        )
        .await
    }

    async fn find_by_content(&self, content: &str) -> Result<Option<LineageEntry>, TokenError> {
        self.bounded("find_by_content", self.inner.find_by_content(content))
            .await
    }

    async fn find_by_access_token(
        &self,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Option<LineageEntry>, TokenError> {
        self.bounded(
            "find_by_access_token",
            self.inner.find_by_access_token(paired_access_ref),
        )
        .await
    }

    async fn invalidate_lineage(&self, access_token_ref: &AccessTokenRef) -> Result<u64, TokenError> {
        self.bounded(
            "invalidate_lineage",
            self.inner.invalidate_lineage(access_token_ref),
        )
        .await
    }
}
