//! Property-based tests for refresh lineage rotation.
//!
//! Property 4: Unknown refresh tokens never touch other lineages
//! Property 5: Reuse of a superseded refresh token revokes the lineage
//! Property 6: Concurrent renewals of one entry yield exactly one winner

use bearer_token::jwt::{Claims, TokenCodec};
use bearer_token::refresh::{AccessTokenRef, LineageEntry, RotationEngine, RotationPolicy, TokenPair};
use bearer_token::storage::{BoundedStore, InMemoryLineageStore, LineageStore};
use bearer_token::TokenError;
use proptest::prelude::*;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const NOW: i64 = 1_700_000_000;

fn engine(secret: &str) -> RotationEngine<InMemoryLineageStore> {
    RotationEngine::new(
        TokenCodec::new(&SecretString::from(secret.to_string())),
        Arc::new(InMemoryLineageStore::new()),
        RotationPolicy::default(),
    )
    .unwrap()
}

/// Shared store that stalls before every child write, so two engines both
/// pass their checks before either one commits.
struct SlowChildStore {
    inner: Arc<InMemoryLineageStore>,
    delay: Duration,
}

impl LineageStore for SlowChildStore {
    async fn create_root_lineage(
        &self,
        content: &str,
        access_token_ref: &AccessTokenRef,
    ) -> Result<Uuid, TokenError> {
        self.inner.create_root_lineage(content, access_token_ref).await
    }

    async fn create_child_lineage(
        &self,
        parent_content: &str,
        content: &str,
        access_token_ref: &AccessTokenRef,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Uuid, TokenError> {
        tokio::time::sleep(self.delay).await;
        self.inner
            .create_child_lineage(parent_content, content, access_token_ref, paired_access_ref)
            .await
    }

    async fn find_by_content(&self, content: &str) -> Result<Option<LineageEntry>, TokenError> {
        self.inner.find_by_content(content).await
    }

    async fn find_by_access_token(
        &self,
        paired_access_ref: &AccessTokenRef,
    ) -> Result<Option<LineageEntry>, TokenError> {
        self.inner.find_by_access_token(paired_access_ref).await
    }

    async fn invalidate_lineage(&self, access_token_ref: &AccessTokenRef) -> Result<u64, TokenError> {
        self.inner.invalidate_lineage(access_token_ref).await
    }
}

fn arb_subject() -> impl Strategy<Value = String> {
    "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}"
}

async fn valid_entries(engine: &RotationEngine<InMemoryLineageStore>, pair: &TokenPair) -> usize {
    let entry = engine
        .store()
        .find_by_access_token(&AccessTokenRef::of(&pair.access_token))
        .await
        .unwrap()
        .unwrap();

    engine
        .store()
        .lineage(&entry.access_token_ref)
        .await
        .iter()
        .filter(|e| e.valid)
        .count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property 4: renewing with content that was never issued fails with
    /// `LineageNotFound` and every unrelated lineage stays valid.
    #[test]
    fn prop_unknown_refresh_leaves_others_untouched(
        subjects in prop::collection::vec(arb_subject(), 1..6),
        junk in "[a-zA-Z0-9._=-]{1,200}",
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let subject_engine = engine("s");
            let mut pairs = Vec::new();
            for subject in &subjects {
                pairs.push(subject_engine.issue_at(Claims::new().with_subject(subject.as_str()), NOW).await.unwrap());
            }

            let outsider = engine("other")
                .issue_at(Claims::new().with_subject("outsider"), NOW)
                .await
                .unwrap();

            let result = subject_engine.renew_at(&junk, &outsider.access_token, NOW + 1).await;
            prop_assert!(matches!(result, Err(TokenError::LineageNotFound)));

            for pair in &pairs {
                prop_assert_eq!(valid_entries(&subject_engine, pair).await, 1);
            }
            Ok(())
        })?;
    }

    /// Property 5: second use of the same refresh token fails, and the pair
    /// returned by the first use is dead as well.
    #[test]
    fn prop_double_renewal_revokes_lineage(subject in arb_subject(), step in 1i64..3_600) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let engine = engine("s");
            let pair = engine.issue_at(Claims::new().with_subject(subject.as_str()), NOW).await.unwrap();

            let renewed = engine.renew_at(&pair.refresh_token, &pair.access_token, NOW + step).await;
            prop_assert!(renewed.is_ok());
            let renewed = renewed.unwrap();

            let reused = engine.renew_at(&pair.refresh_token, &pair.access_token, NOW + step + 1).await;
            prop_assert!(reused.as_ref().err().is_some_and(TokenError::revokes_lineage));

            let after = engine.renew_at(&renewed.refresh_token, &renewed.access_token, NOW + step + 2).await;
            prop_assert!(matches!(after, Err(TokenError::LineageRevoked)));
            prop_assert_eq!(valid_entries(&engine, &renewed).await, 0);
            Ok(())
        })?;
    }
}

#[test]
fn test_concurrent_renewals_single_winner() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    rt.block_on(async {
        for _ in 0..20 {
            let engine = Arc::new(engine("s"));
            let pair = engine
                .issue_at(Claims::new().with_subject("u1"), NOW)
                .await
                .unwrap();

            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    let pair = pair.clone();
                    tokio::spawn(async move {
                        engine
                            .renew_at(&pair.refresh_token, &pair.access_token, NOW + 1)
                            .await
                    })
                })
                .collect();

            let mut winners = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(_) => winners += 1,
                    Err(err) => assert!(matches!(err, TokenError::LineageRevoked)),
                }
            }

            assert_eq!(winners, 1);
            assert!(valid_entries(&engine, &pair).await <= 1);
        }
    });
}

/// Two engines, as in two service instances, share one store and race to
/// rotate the same pair. Only the store can arbitrate between them.
#[tokio::test]
async fn test_engines_sharing_a_store_single_winner() {
    let shared = Arc::new(InMemoryLineageStore::new());
    let store = Arc::new(SlowChildStore {
        inner: Arc::clone(&shared),
        delay: Duration::from_millis(50),
    });
    let instance = || {
        RotationEngine::new(
            TokenCodec::new(&SecretString::from("s".to_string())),
            Arc::clone(&store),
            RotationPolicy::default(),
        )
        .unwrap()
    };
    let (a, b) = (instance(), instance());

    let pair = a.issue_at(Claims::new().with_subject("u1"), NOW).await.unwrap();
    let (first, second) = tokio::join!(
        a.renew_at(&pair.refresh_token, &pair.access_token, NOW + 1),
        b.renew_at(&pair.refresh_token, &pair.access_token, NOW + 1)
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(TokenError::LineageRevoked))));

    let lineage = shared.lineage(&AccessTokenRef::of(&pair.access_token)).await;
    assert_eq!(lineage.len(), 2);
    assert!(lineage.iter().filter(|e| e.valid).count() <= 1);
}

#[tokio::test]
async fn test_two_sessions_renew_independently() {
    let engine = engine("s");
    let first = engine.issue_at(Claims::new().with_subject("u1"), NOW).await.unwrap();
    let second = engine.issue_at(Claims::new().with_subject("u1"), NOW).await.unwrap();

    let first = engine
        .renew_at(&first.refresh_token, &first.access_token, NOW + 10)
        .await
        .unwrap();
    let second = engine
        .renew_at(&second.refresh_token, &second.access_token, NOW + 10)
        .await
        .unwrap();

    engine.revoke(&first.access_token).await.unwrap();

    assert!(engine
        .renew_at(&second.refresh_token, &second.access_token, NOW + 20)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_rotation_through_bounded_store() {
    let store = Arc::new(BoundedStore::new(
        InMemoryLineageStore::new(),
        Duration::from_secs(1),
    ));
    let engine = RotationEngine::new(
        TokenCodec::new(&SecretString::from("s".to_string())),
        Arc::clone(&store),
        RotationPolicy::default(),
    )
    .unwrap();

    let mut pair = engine
        .issue_at(Claims::new().with_subject("u1"), NOW)
        .await
        .unwrap();
    for step in 1..=5 {
        pair = engine
            .renew_at(&pair.refresh_token, &pair.access_token, NOW + step * 30)
            .await
            .unwrap();
    }

    let entry = store
        .find_by_content(&pair.refresh_token)
        .await
        .unwrap()
        .unwrap();
    let lineage = store.inner().lineage(&entry.access_token_ref).await;
    assert_eq!(lineage.len(), 6);
    assert_eq!(lineage.iter().filter(|e| e.valid).count(), 1);
    assert!(lineage.last().unwrap().valid);
}

/// issue `{sub: u1, exp: now+60}` with secret `s`, renew once, then replay.
#[tokio::test]
async fn test_replay_scenario() {
    let engine = engine("s");
    let claims = Claims::new().with_subject("u1").with_expiry(NOW + 60);

    let first = engine.issue_at(claims, NOW).await.unwrap();
    let second = engine
        .renew_at(&first.refresh_token, &first.access_token, NOW + 5)
        .await
        .unwrap();
    assert_ne!(second.access_token, first.access_token);
    assert_ne!(second.refresh_token, first.refresh_token);

    assert!(engine
        .renew_at(&first.refresh_token, &first.access_token, NOW + 6)
        .await
        .is_err());
    assert!(engine
        .renew_at(&second.refresh_token, &second.access_token, NOW + 7)
        .await
        .is_err());
}
