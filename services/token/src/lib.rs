//! Bearer token library.
//!
//! Issues HMAC-signed bearer tokens, verifies them, and rotates refresh
//! tokens through per-session lineages with reuse detection: presenting a
//! superseded or mismatched refresh token revokes the whole lineage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod jwt;
pub mod metrics;
pub mod refresh;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use config::Config;
pub use error::TokenError;
pub use gate::{bearer_token, AccessGate, GatePolicy};
pub use identity::{CredentialAuthority, SubjectProfile};
pub use jwt::{Claims, ClaimsBuilder, TokenCodec};
pub use refresh::{AccessTokenRef, LineageEntry, RotationEngine, RotationPolicy, TokenPair};
pub use session::{SessionService, TokenResponse};
pub use storage::{BoundedStore, InMemoryLineageStore, LineageStore, RedisLineageStore};
