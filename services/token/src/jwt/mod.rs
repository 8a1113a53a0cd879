//! HMAC-SHA256 bearer token codec.

pub mod builder;
pub mod claims;
pub mod codec;
pub mod serializer;
pub mod signer;

pub use builder::ClaimsBuilder;
pub use claims::Claims;
pub use codec::TokenCodec;
pub use serializer::{Header, JwtSerializer};
pub use signer::HmacSigner;
