//! Refresh token lineages and their rotation.

pub mod generator;
pub mod lineage;
pub mod locks;
pub mod rotator;

pub use generator::RefreshTokenGenerator;
pub use lineage::{AccessTokenRef, LineageEntry};
pub use locks::LineageLocks;
pub use rotator::{RotationEngine, RotationPolicy, TokenPair};
