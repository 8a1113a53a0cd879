//! Byte-exact JSON and segment encoding for tokens.
//!
//! Signatures are computed over the raw serialized header and claims, so the
//! serialized bytes must stay identical to what deployed issuers produced:
//! compact output, sorted claim keys, and HTML-sensitive characters escaped
//! as `\u00XX` sequences.

use crate::error::TokenError;
use crate::jwt::claims::Claims;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use std::io;

/// The only algorithm this codec produces or accepts.
pub const ALGORITHM: &str = "HS256";
/// Token type carried in every header.
pub const TOKEN_TYPE: &str = "JWT";

/// Fixed token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Signing algorithm
    pub alg: String,
    /// Token type
    pub typ: String,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Compact formatter that additionally escapes `<`, `>`, `&`, U+2028 and U+2029.
struct EscapingFormatter;

impl Formatter for EscapingFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..index].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Encoding and decoding of token segments.
pub struct JwtSerializer;

impl JwtSerializer {
    /// Serialize any value to the canonical compact byte form.
    pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, TokenError> {
        let mut out = Vec::with_capacity(128);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, EscapingFormatter);
        value.serialize(&mut serializer)?;
        Ok(out)
    }

    /// Serialized fixed header.
    pub fn header_json() -> Result<Vec<u8>, TokenError> {
        Self::to_json(&Header::default())
    }

    /// Serialized claims with sorted keys.
    pub fn claims_json(claims: &Claims) -> Result<Vec<u8>, TokenError> {
        Self::to_json(claims)
    }

    /// Standard padded base64.
    pub fn encode_segment(raw: &[u8]) -> String {
        STANDARD.encode(raw)
    }

    /// Decode one segment; `name` is used in the error message.
    pub fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, TokenError> {
        STANDARD
            .decode(segment)
            .map_err(|e| TokenError::malformed(format!("{name} segment is not valid base64: {e}")))
    }

    /// Parse a header and require the HS256 algorithm.
    pub fn parse_header(raw: &[u8]) -> Result<Header, TokenError> {
        let header: Header = serde_json::from_slice(raw)
            .map_err(|e| TokenError::malformed(format!("header is not valid JSON: {e}")))?;

        if header.alg != ALGORITHM {
            return Err(TokenError::malformed(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        Ok(header)
    }

    /// Parse the claims object.
    pub fn parse_claims(raw: &[u8]) -> Result<Claims, TokenError> {
        serde_json::from_slice(raw)
            .map_err(|e| TokenError::malformed(format!("payload is not a string map: {e}")))
    }

    /// Split a token into exactly three segments.
    pub fn split(token: &str) -> Result<[&str; 3], TokenError> {
        let mut parts = token.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(header), Some(payload), Some(signature), None) => {
                Ok([header, payload, signature])
            }
            _ => Err(TokenError::malformed("token must have exactly three segments")),
        }
    }
}
