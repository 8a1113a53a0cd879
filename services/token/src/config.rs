//! Configuration for the bearer token service.
//!
//! Loaded from environment variables (and a `.env` file when present) and
//! validated once at construction. Nothing here is global: the resulting
//! [`Config`] is handed to the components that need it.

use crate::error::TokenError;
use crate::refresh::RotationPolicy;
use rust_common::TracingConfig;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration, validated on load.
#[derive(Debug)]
pub struct Config {
    /// Shared HMAC secret for signing and verifying tokens
    pub token_secret: SecretString,
    /// `iss` claim stamped on access tokens
    pub jwt_issuer: String,
    /// `aud` claim stamped on access tokens
    pub jwt_audience: String,
    /// Lifetime of minted access tokens
    pub access_token_ttl: Duration,
    /// Lifetime of refresh tokens; must exceed the access TTL
    pub refresh_token_ttl: Duration,
    /// Upper bound for any single token store call
    pub store_timeout: Duration,
    /// Redis lineage store; the in-memory store is used when unset
    pub redis_url: Option<String>,
    /// Key prefix for the Redis store
    pub store_namespace: String,
    /// Default tracing filter
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if a variable is missing or invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret = lookup("TOKEN_SECRET")
            .filter(|s| !s.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| TokenError::config("TOKEN_SECRET is required"))?;

        let jwt_issuer = lookup("JWT_ISSUER").unwrap_or_else(|| "go-auth.app.com".to_string());
        let jwt_audience =
            lookup("JWT_AUDIENCE").unwrap_or_else(|| "frontend.app.com".to_string());

        let access_token_ttl = Duration::from_secs(parse_var(&lookup, "ACCESS_TOKEN_TTL", 60)?);
        let refresh_token_ttl =
            Duration::from_secs(parse_var(&lookup, "REFRESH_TOKEN_TTL", 86_400)?);
        let store_timeout = Duration::from_millis(parse_var(&lookup, "STORE_TIMEOUT_MS", 2_000)?);

        let config = Self {
            token_secret,
            jwt_issuer,
            jwt_audience,
            access_token_ttl,
            refresh_token_ttl,
            store_timeout,
            redis_url: lookup("REDIS_URL").filter(|s| !s.is_empty()),
            store_namespace: lookup("STORE_NAMESPACE").unwrap_or_else(|| "lineage".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: parse_var(&lookup, "LOG_JSON", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), TokenError> {
        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err(TokenError::config("token TTLs must be positive"));
        }
        if self.access_token_ttl >= self.refresh_token_ttl {
            return Err(TokenError::config(
                "ACCESS_TOKEN_TTL must be shorter than REFRESH_TOKEN_TTL",
            ));
        }
        if self.store_timeout.is_zero() {
            return Err(TokenError::config("STORE_TIMEOUT_MS must be positive"));
        }
        if self.token_secret.expose_secret().len() < 16 {
            tracing::warn!("TOKEN_SECRET is shorter than 16 bytes");
        }
        Ok(())
    }

    /// Token lifetimes for the rotation engine.
    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy {
            access_ttl: self.access_token_ttl,
            refresh_ttl: self.refresh_token_ttl,
        }
    }

    /// Subscriber settings derived from the log options.
    pub fn tracing(&self) -> TracingConfig {
        let tracing = TracingConfig::default().with_log_level(self.log_level.clone());
        if self.log_json {
            tracing.with_json_output()
        } else {
            tracing
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, TokenError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("TOKEN_SECRET", "a-long-enough-secret")]).unwrap();

        assert_eq!(config.jwt_issuer, "go-auth.app.com");
        assert_eq!(config.jwt_audience, "frontend.app.com");
        assert_eq!(config.access_token_ttl, Duration::from_secs(60));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.store_timeout, Duration::from_secs(2));
        assert_eq!(config.store_namespace, "lineage");
        assert!(config.redis_url.is_none());
        assert!(!config.log_json);
        assert_eq!(config.rotation_policy(), RotationPolicy::default());
    }

    #[test]
    fn test_secret_is_required() {
        assert!(matches!(load(&[]), Err(TokenError::Config(_))));
        assert!(matches!(load(&[("TOKEN_SECRET", "")]), Err(TokenError::Config(_))));
    }

    #[test]
    fn test_invalid_number() {
        let result = load(&[("TOKEN_SECRET", "secret"), ("ACCESS_TOKEN_TTL", "soon")]);
        assert!(matches!(result, Err(TokenError::Config(msg)) if msg.contains("ACCESS_TOKEN_TTL")));
    }

    #[test]
    fn test_access_ttl_must_be_shorter() {
        let result = load(&[
            ("TOKEN_SECRET", "secret"),
            ("ACCESS_TOKEN_TTL", "600"),
            ("REFRESH_TOKEN_TTL", "600"),
        ]);
        assert!(result.is_err());

        let result = load(&[("TOKEN_SECRET", "secret"), ("ACCESS_TOKEN_TTL", "0")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TOKEN_SECRET", "secret"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("LOG_JSON", "true"),
            ("STORE_TIMEOUT_MS", "250"),
        ])
        .unwrap();

        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert!(config.tracing().json_output);
    }

    #[test]
    fn test_secret_not_in_debug() {
        let config = load(&[("TOKEN_SECRET", "super-secret-value")]).unwrap();
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}
