//! In-process lineage store.
//!
//! A single `RwLock` guards all indexes, so each operation is one critical
//! section and behaves like a transaction.

use crate::error::TokenError;
use crate::refresh::lineage::{AccessTokenRef, LineageEntry};
use crate::storage::LineageStore;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Indexes {
    entries: HashMap<Uuid, LineageEntry>,
    by_content: HashMap<String, Uuid>,
    by_lineage: HashMap<AccessTokenRef, Vec<Uuid>>,
    by_paired: HashMap<AccessTokenRef, Uuid>,
}

impl Indexes {
    fn insert(&mut self, entry: LineageEntry) -> Result<Uuid, TokenError> {
        if self.by_content.contains_key(&entry.content) {
            return Err(TokenError::ContentConflict);
        }

        let id = entry.id;
        self.by_content.insert(entry.content.clone(), id);
        self.by_lineage
            .entry(entry.access_token_ref.clone())
            .or_default()
            .push(id);
        self.by_paired.insert(entry.paired_access_ref.clone(), id);
        self.entries.insert(id, entry);
        Ok(id)
    }

    fn invalidate(&mut self, access_token_ref: &AccessTokenRef) -> u64 {
        let Some(ids) = self.by_lineage.get(access_token_ref) else {
            return 0;
        };

        let mut flipped = 0;
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id) {
                if entry.invalidate() {
                    flipped += 1;
                }
            }
        }
        flipped
    }
}

/// Lineage store held in process memory.
#[derive(Default)]
pub struct InMemoryLineageStore {
    inner: RwLock<Indexes>,
}

impl InMemoryLineageStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries of a lineage in creation order.
    pub async fn lineage(&self, access_token_ref: &AccessTokenRef) -> Vec<LineageEntry> {
        let inner = self.inner.read().await;
        inner
            .by_lineage
            .get(access_token_ref)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.entries.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl LineageStore for InMemoryLineageStore {
    async fn create_root_lineage(
        &self,
        content: &str,
        access_token_ref: &AccessTokenRef,
    ) -> Result<Uuid, TokenError> {
        let entry = LineageEntry::root(
            content.to_string(),
            access_token_ref.clone(),
            chrono::Utc::now().timestamp(),
        );

        let id = self.inner.write().await.insert(entry)?;
        debug!(lineage = %access_token_ref, %id, "root lineage entry created");
        Ok(id)
    }

    async fn create_child_lineage(
        &self,
        parent_content: &str,
        content: &str,
        access_token_ref: &AccessTokenRef,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Uuid, TokenError> {
        let mut inner = self.inner.write().await;

        if !inner.by_lineage.contains_key(access_token_ref) {
            return Err(TokenError::LineageNotFound);
        }
        let parent = inner
            .by_content
            .get(parent_content)
            .and_then(|id| inner.entries.get(id))
            .filter(|parent| parent.access_token_ref == *access_token_ref)
            .ok_or(TokenError::LineageNotFound)?;
        if !parent.valid {
            return Err(TokenError::LineageRevoked);
        }
        if inner.by_content.contains_key(content) {
            return Err(TokenError::ContentConflict);
        }

        let superseded = inner.invalidate(access_token_ref);
        let id = inner.insert(LineageEntry::child(
            content.to_string(),
            access_token_ref.clone(),
            paired_access_ref.clone(),
            chrono::Utc::now().timestamp(),
        ))?;

        debug!(lineage = %access_token_ref, %id, superseded, "child lineage entry created");
        Ok(id)
    }

    async fn find_by_content(&self, content: &str) -> Result<Option<LineageEntry>, TokenError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_content
            .get(content)
            .and_then(|id| inner.entries.get(id))
            .cloned())
    }

    async fn find_by_access_token(
        &self,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Option<LineageEntry>, TokenError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_paired
            .get(paired_access_ref)
            .and_then(|id| inner.entries.get(id))
            .cloned())
    }

    async fn invalidate_lineage(&self, access_token_ref: &AccessTokenRef) -> Result<u64, TokenError> {
        let flipped = self.inner.write().await.invalidate(access_token_ref);
        debug!(lineage = %access_token_ref, flipped, "lineage invalidated");
        Ok(flipped)
    }
}
