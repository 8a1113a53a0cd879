//! Redis-backed lineage store.
//!
//! Layout under the configured namespace:
//! - `{ns}:entry:{digest}`: hash with `data` (entry JSON) and `valid` (`1`/`0`)
//! - `{ns}:lineage:{access_ref}`: set of entry digests in the lineage
//! - `{ns}:paired:{access_ref}`: digest of the entry minted with that access token
//!
//! `digest` is the base64url SHA-256 of the refresh token content. Every
//! mutation is a single Lua script, so it is atomic on the server and a
//! dropped request never leaves a half-written lineage.

use crate::error::TokenError;
use crate::refresh::lineage::{AccessTokenRef, LineageEntry};
use crate::storage::LineageStore;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::Script;
use rust_common::{PlatformError, RetryPolicy};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const INSERT_ENTRY: &str = r"
local ttl = tonumber(ARGV[3])
redis.call('HSET', KEYS[1], 'data', ARGV[1], 'valid', '1')
redis.call('SADD', KEYS[2], ARGV[2])
redis.call('SET', KEYS[3], ARGV[2])
if ttl > 0 then
  redis.call('EXPIRE', KEYS[1], ttl)
  redis.call('EXPIRE', KEYS[2], ttl)
  redis.call('EXPIRE', KEYS[3], ttl)
end
";

const INVALIDATE_MEMBERS: &str = r"
local flipped = 0
for _, digest in ipairs(redis.call('SMEMBERS', KEYS[2])) do
  local key = ARGV[4] .. digest
  if redis.call('HGET', key, 'valid') == '1' then
    redis.call('HSET', key, 'valid', '0')
    flipped = flipped + 1
  end
end
";

// KEYS: entry, lineage, paired. ARGV: data, digest, ttl. Returns 1, or 0 on duplicate content.
static CREATE_ROOT: Lazy<Script> = Lazy::new(|| {
    Script::new(&format!(
        "if redis.call('EXISTS', KEYS[1]) == 1 then return 0 end\n{INSERT_ENTRY}\nreturn 1"
    ))
});

// KEYS: entry, lineage, paired, parent entry. ARGV: data, digest, ttl, entry prefix, parent digest.
// Returns 1, 0 on duplicate content, -1 when the lineage or the parent is unknown,
// -2 when the parent has already been superseded or revoked.
static CREATE_CHILD: Lazy<Script> = Lazy::new(|| {
    Script::new(&format!(
        "if redis.call('EXISTS', KEYS[2]) == 0 then return -1 end\n\
         if redis.call('SISMEMBER', KEYS[2], ARGV[5]) == 0 then return -1 end\n\
         if redis.call('HGET', KEYS[4], 'valid') ~= '1' then return -2 end\n\
         if redis.call('EXISTS', KEYS[1]) == 1 then return 0 end\n\
         {INVALIDATE_MEMBERS}\n{INSERT_ENTRY}\nreturn 1"
    ))
});

// KEYS: unused, lineage. ARGV: unused x3, entry prefix. Returns flipped count.
static INVALIDATE: Lazy<Script> =
    Lazy::new(|| Script::new(&format!("{INVALIDATE_MEMBERS}\nreturn flipped")));

/// Lineage store shared by every service instance.
pub struct RedisLineageStore {
    conn: ConnectionManager,
    namespace: String,
    retention: Option<Duration>,
}

impl RedisLineageStore {
    /// Connect, retrying transient failures with `retry`.
    pub async fn connect(
        redis_url: &str,
        namespace: impl Into<String>,
        retry: &RetryPolicy,
    ) -> Result<Self, TokenError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PlatformError::invalid_input(format!("invalid redis url: {e}")))?;

        let conn = retry
            .execute("redis_connect", || {
                let client = client.clone();
                async move {
                    ConnectionManager::new(client)
                        .await
                        .map_err(|e| PlatformError::unavailable(e.to_string()))
                }
            })
            .await?;

        let namespace = namespace.into();
        info!(namespace = %namespace, "connected to redis lineage store");

        Ok(RedisLineageStore {
            conn,
            namespace,
            retention: None,
        })
    }

    /// Expire lineage data after `retention`. Without it entries are kept indefinitely.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    fn entry_prefix(&self) -> String {
        format!("{}:entry:", self.namespace)
    }

    fn entry_key(&self, digest: &str) -> String {
        format!("{}{}", self.entry_prefix(), digest)
    }

    fn lineage_key(&self, access_token_ref: &AccessTokenRef) -> String {
        format!("{}:lineage:{}", self.namespace, access_token_ref)
    }

    fn paired_key(&self, paired_access_ref: &AccessTokenRef) -> String {
        format!("{}:paired:{}", self.namespace, paired_access_ref)
    }

    fn retention_secs(&self) -> u64 {
        self.retention.map_or(0, |d| d.as_secs().max(1))
    }

    async fn insert(
        &self,
        script: &Script,
        entry: &LineageEntry,
        parent_digest: Option<&str>,
    ) -> Result<i64, TokenError> {
        let digest = content_digest(&entry.content);
        let data = serde_json::to_string(entry)?;

        let mut invocation = script.prepare_invoke();
        invocation
            .key(self.entry_key(&digest))
            .key(self.lineage_key(&entry.access_token_ref))
            .key(self.paired_key(&entry.paired_access_ref))
            .arg(data)
            .arg(&digest)
            .arg(self.retention_secs())
            .arg(self.entry_prefix());

        if let Some(parent) = parent_digest {
            invocation.key(self.entry_key(parent)).arg(parent);
        }

        let mut conn = self.conn.clone();
        Ok(invocation.invoke_async(&mut conn).await?)
    }

    async fn load(&self, digest: &str) -> Result<Option<LineageEntry>, TokenError> {
        let mut conn = self.conn.clone();
        let (data, valid): (Option<String>, Option<String>) = redis::cmd("HMGET")
            .arg(self.entry_key(digest))
            .arg("data")
            .arg("valid")
            .query_async(&mut conn)
            .await?;

        let Some(data) = data else {
            return Ok(None);
        };

        let mut entry: LineageEntry = serde_json::from_str(&data)
            .map_err(|e| TokenError::internal(format!("corrupt lineage entry {digest}: {e}")))?;
        entry.valid = valid.as_deref() == Some("1");
        Ok(Some(entry))
    }
}

/// Key-safe digest of refresh token content.
pub fn content_digest(content: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(content.as_bytes()))
}

impl LineageStore for RedisLineageStore {
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

        match self.insert(&CREATE_ROOT, &entry, None).await? {
            1 => {
                debug!(lineage = %access_token_ref, id = %entry.id, "root lineage entry created");
                Ok(entry.id)
            }
            0 => Err(TokenError::ContentConflict),
            other => Err(TokenError::internal(format!("unexpected script result {other}"))),
        }
    }

    async fn create_child_lineage(
        &self,
        parent_content: &str,
        content: &str,
        access_token_ref: &AccessTokenRef,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Uuid, TokenError> {
        let entry = LineageEntry::child(
            content.to_string(),
            access_token_ref.clone(),
            paired_access_ref.clone(),
            chrono::Utc::now().timestamp(),
        );

        let parent = content_digest(parent_content);
        match self.insert(&CREATE_CHILD, &entry, Some(&parent)).await? {
            1 => {
                debug!(lineage = %access_token_ref, id = %entry.id, "child lineage entry created");
                Ok(entry.id)
            }
            0 => Err(TokenError::ContentConflict),
            -1 => Err(TokenError::LineageNotFound),
            -2 => Err(TokenError::LineageRevoked),
            other => Err(TokenError::internal(format!("unexpected script result {other}"))),
        }
    }

    async fn find_by_content(&self, content: &str) -> Result<Option<LineageEntry>, TokenError> {
        self.load(&content_digest(content)).await
    }

    async fn find_by_access_token(
        &self,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Option<LineageEntry>, TokenError> {
        let mut conn = self.conn.clone();
        let digest: Option<String> = redis::cmd("GET")
            .arg(self.paired_key(paired_access_ref))
            .query_async(&mut conn)
            .await?;

        match digest {
            Some(digest) => self.load(&digest).await,
            None => Ok(None),
        }
    }

    async fn invalidate_lineage(&self, access_token_ref: &AccessTokenRef) -> Result<u64, TokenError> {
        let mut invocation = INVALIDATE.prepare_invoke();
        invocation
            .key(format!("{}:unused", self.namespace))
            .key(self.lineage_key(access_token_ref))
            .arg(0)
            .arg(0)
            .arg(0)
            .arg(self.entry_prefix());

        let mut conn = self.conn.clone();
        let flipped: u64 = invocation.invoke_async(&mut conn).await?;
        debug!(lineage = %access_token_ref, flipped, "lineage invalidated");
        Ok(flipped)
    }
}
