//! Property-based tests for the token codec.
//!
//! Property 1: Claims round-trip through issue and verify
//! Property 2: Signatures bind the secret and every signature byte
//! Property 3: Expiry boundary is inclusive

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bearer_token::jwt::{Claims, TokenCodec};
use bearer_token::TokenError;
use proptest::prelude::*;
use secrecy::SecretString;
use std::collections::BTreeMap;

fn codec(secret: &str) -> TokenCodec {
    TokenCodec::new(&SecretString::from(secret.to_string()))
}

/// Arbitrary string claims, including characters that need JSON escaping.
fn arb_claims() -> impl Strategy<Value = Claims> {
    prop::collection::btree_map("[a-z_]{1,12}", "\\PC{0,40}", 0..8).prop_map(Claims::from)
}

fn arb_secret() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,48}".prop_map(|s| s)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1: verify(issue(C)) == C
    #[test]
    fn prop_claims_round_trip(claims in arb_claims(), secret in arb_secret()) {
        let codec = codec(&secret);
        let token = codec.issue(&claims).unwrap();

        prop_assert_eq!(token.split('.').count(), 3);
        prop_assert_eq!(&codec.verify(&token).unwrap(), &claims);
        prop_assert_eq!(&TokenCodec::extract_claims(&token).unwrap(), &claims);
    }

    /// Property 2: a different secret never verifies
    #[test]
    fn prop_wrong_secret_is_bad_signature(
        claims in arb_claims(),
        secret in arb_secret(),
        other in arb_secret(),
    ) {
        prop_assume!(secret != other);
        let token = codec(&secret).issue(&claims).unwrap();

        prop_assert!(matches!(codec(&other).verify(&token), Err(TokenError::BadSignature)));
    }

    /// Property 2: flipping any bit of the signature is detected
    #[test]
    fn prop_mutated_signature_is_bad_signature(
        claims in arb_claims(),
        index in 0usize..32,
        bit in 0u8..8,
    ) {
        let codec = codec("secret");
        let token = codec.issue(&claims).unwrap();
        let segments: Vec<&str> = token.split('.').collect();

        let mut signature = STANDARD.decode(segments[2]).unwrap();
        prop_assert_eq!(signature.len(), 32);
        signature[index] ^= 1 << bit;

        let forged = format!("{}.{}.{}", segments[0], segments[1], STANDARD.encode(&signature));
        prop_assert!(matches!(codec.verify(&forged), Err(TokenError::BadSignature)));
    }

    /// Property 3: valid through `exp`, expired one second later
    #[test]
    fn prop_expiry_boundary(exp in 0i64..4_000_000_000, ttl in 1i64..86_400) {
        let codec = codec("secret");
        let token = codec.issue(&Claims::new().with_subject("u1").with_expiry(exp)).unwrap();

        prop_assert!(codec.verify_unexpired(&token, exp - ttl).is_ok());
        prop_assert!(codec.verify_unexpired(&token, exp).is_ok());
        prop_assert!(matches!(
            codec.verify_unexpired(&token, exp + 1),
            Err(TokenError::Expired)
        ));
    }

    /// Claims without `exp` never expire
    #[test]
    fn prop_missing_expiry_never_expires(now in any::<i64>()) {
        let claims = Claims::new().with_subject("u1");
        prop_assert!(TokenCodec::check_expiry(&claims, now).is_ok());
    }
}

#[test]
fn test_existing_deployment_vector() {
    let claims: Claims = [("email", "foo@bar.com"), ("role", "0")].into_iter().collect();
    let token = codec("secret").issue(&claims).unwrap();

    assert_eq!(
        token,
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJlbWFpbCI6ImZvb0BiYXIuY29tIiwicm9sZSI6IjAifQ==.7qIvfw2PCfu5DfbbsaGBJFoXvyEWpsCm460nMjC3yuk="
    );
}

#[test]
fn test_signature_covers_raw_json() {
    let claims: Claims = [("sub", "u1")].into_iter().collect();
    let token = codec("secret").issue(&claims).unwrap();
    let segments: Vec<&str> = token.split('.').collect();

    let header = STANDARD.decode(segments[0]).unwrap();
    let payload = STANDARD.decode(segments[1]).unwrap();
    assert_eq!(header, br#"{"alg":"HS256","typ":"JWT"}"#);
    assert_eq!(payload, br#"{"sub":"u1"}"#);

    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, b"secret");
    let expected = ring::hmac::sign(&key, &[header, payload].concat());
    assert_eq!(segments[2], STANDARD.encode(expected.as_ref()));
}

#[test]
fn test_foreign_algorithm_header_is_malformed() {
    let header = br#"{"alg":"none","typ":"JWT"}"#;
    let payload = br#"{"sub":"u1"}"#;
    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, b"secret");
    let signature = ring::hmac::sign(&key, &[&header[..], &payload[..]].concat());

    let token = format!(
        "{}.{}.{}",
        STANDARD.encode(header),
        STANDARD.encode(payload),
        STANDARD.encode(signature.as_ref())
    );

    assert!(matches!(codec("secret").verify(&token), Err(TokenError::MalformedToken(_))));
}

#[test]
fn test_claims_keep_unknown_keys() {
    let mut map = BTreeMap::new();
    map.insert("tenant".to_string(), "acme".to_string());
    map.insert("sub".to_string(), "u1".to_string());

    let codec = codec("secret");
    let claims = codec.verify(&codec.issue(&Claims::from(map)).unwrap()).unwrap();
    assert_eq!(claims.get("tenant"), Some("acme"));
}
