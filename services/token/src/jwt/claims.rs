//! Token claims: a sorted map of string values.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, Iter};

/// Subject identifier.
pub const SUB: &str = "sub";
/// Audience.
pub const AUD: &str = "aud";
/// Issuer.
pub const ISS: &str = "iss";
/// Issued-at, unix seconds as decimal text.
pub const IAT: &str = "iat";
/// Expiry, unix seconds as decimal text.
pub const EXP: &str = "exp";
/// Space separated scope.
pub const SCOPE: &str = "scope";
/// Unique token identifier stamped on every minted access token.
pub const JTI: &str = "jti";

/// Token payload: a flat map of string keys to string values.
///
/// Numeric values (`iat`, `exp`) are carried as decimal text. Keys are kept
/// sorted so the serialized form is deterministic. Unknown keys round-trip
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, String>);

impl Claims {
    /// Empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of claims.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no claims.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Claims in key order.
    pub fn iter(&self) -> Iter<'_, String, String> {
        self.0.iter()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `sub`.
    pub fn with_subject(self, subject: impl Into<String>) -> Self {
        self.with(SUB, subject)
    }

    /// Set `aud`.
    pub fn with_audience(self, audience: impl Into<String>) -> Self {
        self.with(AUD, audience)
    }

    /// Set `iss`.
    pub fn with_issuer(self, issuer: impl Into<String>) -> Self {
        self.with(ISS, issuer)
    }

    /// Set `scope`.
    pub fn with_scope(self, scope: impl Into<String>) -> Self {
        self.with(SCOPE, scope)
    }

    /// Set `iat` to unix seconds.
    pub fn with_issued_at(self, timestamp: i64) -> Self {
        self.with(IAT, timestamp.to_string())
    }

    /// Set `exp` to unix seconds.
    pub fn with_expiry(self, timestamp: i64) -> Self {
        self.with(EXP, timestamp.to_string())
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.get(SUB)
    }

    /// The `aud` claim.
    pub fn audience(&self) -> Option<&str> {
        self.get(AUD)
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<&str> {
        self.get(ISS)
    }

    /// The `scope` claim.
    pub fn scope(&self) -> Option<&str> {
        self.get(SCOPE)
    }

    /// Raw `iat` text, if present.
    pub fn issued_at(&self) -> Option<&str> {
        self.get(IAT)
    }

    /// Raw `exp` text, if present. Parsing is left to expiry checking.
    pub fn expires_at(&self) -> Option<&str> {
        self.get(EXP)
    }

    /// Set `iat` to `now` and `exp` to `now + ttl_seconds`.
    pub fn stamp_lifetime(&mut self, now: i64, ttl_seconds: i64) {
        self.insert(IAT, now.to_string());
        self.insert(EXP, now.saturating_add(ttl_seconds).to_string());
    }
}

impl From<BTreeMap<String, String>> for Claims {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Claims {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Claims {
    type Item = (&'a String, &'a String);
    type IntoIter = Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
