//! Lineage store scripts against a live Redis.
//!
//! Skipped unless `REDIS_URL` is set. Each test works in its own namespace.

use bearer_token::jwt::{Claims, TokenCodec};
use bearer_token::refresh::{AccessTokenRef, RotationEngine, RotationPolicy};
use bearer_token::storage::redis::content_digest;
use bearer_token::storage::{LineageStore, RedisLineageStore};
use bearer_token::TokenError;
use rust_common::{RetryConfig, RetryPolicy};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const NOW: i64 = 1_700_000_000;

fn redis_url() -> Option<String> {
    std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty())
}

async fn store_in(namespace: &str) -> Option<RedisLineageStore> {
    let url = redis_url()?;
    let retry = RetryPolicy::new(RetryConfig::default().with_max_retries(1));
    Some(
        RedisLineageStore::connect(&url, namespace, &retry)
            .await
            .unwrap(),
    )
}

fn namespace() -> String {
    format!("lineage-test:{}", Uuid::new_v4())
}

fn reference(token: &str) -> AccessTokenRef {
    AccessTokenRef::of(token)
}

#[tokio::test]
async fn test_root_lookup_and_duplicate() {
    let Some(store) = store_in(&namespace()).await else {
        return;
    };
    let id = store.create_root_lineage("r1", &reference("t1")).await.unwrap();

    let entry = store.find_by_content("r1").await.unwrap().unwrap();
    assert_eq!(entry.id, id);
    assert!(entry.valid);
    assert!(entry.is_root());

    let paired = store.find_by_access_token(&reference("t1")).await.unwrap().unwrap();
    assert_eq!(paired.id, id);
    assert!(store.find_by_content("missing").await.unwrap().is_none());

    let duplicate = store.create_root_lineage("r1", &reference("t2")).await;
    assert!(matches!(duplicate, Err(TokenError::ContentConflict)));
}

#[tokio::test]
async fn test_child_script_outcomes() {
    let Some(store) = store_in(&namespace()).await else {
        return;
    };
    let root = reference("t1");
    store.create_root_lineage("r1", &root).await.unwrap();
    store.create_root_lineage("x1", &reference("other")).await.unwrap();

    let unknown = store
        .create_child_lineage("r1", "r2", &reference("unknown"), &reference("t2"))
        .await;
    assert!(matches!(unknown, Err(TokenError::LineageNotFound)));

    let foreign_parent = store
        .create_child_lineage("x1", "r2", &root, &reference("t2"))
        .await;
    assert!(matches!(foreign_parent, Err(TokenError::LineageNotFound)));

    let duplicate = store
        .create_child_lineage("r1", "x1", &root, &reference("t2"))
        .await;
    assert!(matches!(duplicate, Err(TokenError::ContentConflict)));

    store
        .create_child_lineage("r1", "r2", &root, &reference("t2"))
        .await
        .unwrap();
    assert!(!store.find_by_content("r1").await.unwrap().unwrap().valid);

    let child = store.find_by_content("r2").await.unwrap().unwrap();
    assert!(child.valid);
    assert_eq!(child.access_token_ref, root);
    assert!(child.is_paired_with(&reference("t2")));

    let superseded = store
        .create_child_lineage("r1", "r3", &root, &reference("t3"))
        .await;
    assert!(matches!(superseded, Err(TokenError::LineageRevoked)));
    assert!(store.find_by_content("r3").await.unwrap().is_none());
    assert!(store.find_by_content("r2").await.unwrap().unwrap().valid);
}

#[tokio::test]
async fn test_invalidate_is_idempotent_and_scoped() {
    let Some(store) = store_in(&namespace()).await else {
        return;
    };
    let first = reference("t1");
    store.create_root_lineage("r1", &first).await.unwrap();
    store
        .create_child_lineage("r1", "r2", &first, &reference("t2"))
        .await
        .unwrap();
    store.create_root_lineage("x1", &reference("other")).await.unwrap();

    assert_eq!(store.invalidate_lineage(&first).await.unwrap(), 1);
    assert_eq!(store.invalidate_lineage(&first).await.unwrap(), 0);
    assert_eq!(store.invalidate_lineage(&reference("nope")).await.unwrap(), 0);

    assert!(!store.find_by_content("r2").await.unwrap().unwrap().valid);
    assert!(store.find_by_content("x1").await.unwrap().unwrap().valid);
}

#[tokio::test]
async fn test_retention_sets_expiry() {
    let ns = namespace();
    let Some(store) = store_in(&ns).await else {
        return;
    };
    let store = store.with_retention(Duration::from_secs(300));
    store.create_root_lineage("r1", &reference("t1")).await.unwrap();

    let Some(url) = redis_url() else {
        return;
    };
    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let ttl: i64 = redis::cmd("TTL")
        .arg(format!("{ns}:entry:{}", content_digest("r1")))
        .query_async(&mut conn)
        .await
        .unwrap();

    assert!(ttl > 0 && ttl <= 300);
}

/// Two service instances with their own connections rotate the same pair.
#[tokio::test]
async fn test_instances_race_single_winner() {
    let ns = namespace();
    let (Some(first), Some(second)) = (store_in(&ns).await, store_in(&ns).await) else {
        return;
    };
    let instance = |store: RedisLineageStore| {
        RotationEngine::new(
            TokenCodec::new(&SecretString::from("s".to_string())),
            Arc::new(store),
            RotationPolicy::default(),
        )
        .unwrap()
    };
    let (a, b) = (instance(first), instance(second));

    for _ in 0..10 {
        let pair = a.issue_at(Claims::new().with_subject("u1"), NOW).await.unwrap();
        let (left, right) = tokio::join!(
            a.renew_at(&pair.refresh_token, &pair.access_token, NOW + 1),
            b.renew_at(&pair.refresh_token, &pair.access_token, NOW + 1)
        );

        let outcomes = [left, right];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(TokenError::LineageRevoked))));
    }
}
