//! Issue a pair, rotate it, then replay the superseded refresh token.
//!
//! Uses Redis when `REDIS_URL` is set, otherwise the in-memory store.
//! `TOKEN_SECRET` must be set (a `.env` file works too).

use bearer_token::jwt::ClaimsBuilder;
use bearer_token::refresh::RotationEngine;
use bearer_token::storage::{BoundedStore, InMemoryLineageStore, LineageStore, RedisLineageStore};
use bearer_token::{Config, TokenError};
use rust_common::{init_tracing, RetryPolicy};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), TokenError> {
    let config = Config::from_env()?;
    init_tracing(&config.tracing().with_service_name("rotation-demo"));

    match &config.redis_url {
        Some(url) => {
            let store =
                RedisLineageStore::connect(url, config.store_namespace.as_str(), &RetryPolicy::default())
                    .await?;
            run(&config, store).await
        }
        None => run(&config, InMemoryLineageStore::new()).await,
    }
}

async fn run<S: LineageStore>(config: &Config, store: S) -> Result<(), TokenError> {
    let engine = RotationEngine::new(
        bearer_token::TokenCodec::new(&config.token_secret),
        Arc::new(BoundedStore::new(store, config.store_timeout)),
        config.rotation_policy(),
    )?;

    let claims = ClaimsBuilder::new(config.jwt_issuer.as_str())
        .audience(config.jwt_audience.as_str())
        .subject("demo-subject")
        .build()?;

    let first = engine.issue(claims).await?;
    info!(expires_in = first.expires_in, "issued first pair");

    let second = engine.renew(&first.refresh_token, &first.access_token).await?;
    info!("rotated to second pair");

    match engine.renew(&first.refresh_token, &first.access_token).await {
        Ok(_) => warn!("replay was accepted"),
        Err(err) => info!(code = err.code(), "replay rejected"),
    }

    match engine.renew(&second.refresh_token, &second.access_token).await {
        Ok(_) => warn!("lineage survived replay"),
        Err(err) => info!(code = err.code(), "lineage revoked after replay"),
    }

    Ok(())
}
