//! Compact JWS decoding and signature verification for proof JWTs.
//!
//! Splits `header.payload.signature`, decodes the first two segments as JSON
//! objects, and verifies the signature against a public JWK. `ES256` and
//! `EdDSA` (Ed25519) are the only algorithms with a verifier.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{Map, Value};

/// JWS algorithms [`DecodedJws::verify`] can check.
pub const SUPPORTED_ALGS: [&str; 2] = ["ES256", "EdDSA"];

const PRIVATE_JWK_MEMBERS: [&str; 7] = ["d", "p", "q", "dp", "dq", "qi", "k"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JwsError {
    #[error("not a compact JWS")]
    Malformed,

    #[error("{0} is not valid base64url")]
    Encoding(&'static str),

    #[error("{0} is not a JSON object")]
    NotAnObject(&'static str),

    #[error("unsupported JWS algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid JWK: {0}")]
    InvalidKey(&'static str),

    #[error("signature verification failed")]
    BadSignature,
}

/// Decoded header and payload of a compact JWS, with what is needed to
/// verify it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedJws {
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
    signing_input: String,
    signature: Vec<u8>,
}

impl DecodedJws {
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header.get(name).and_then(Value::as_str)
    }

    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// Verify the signature with `jwk` under the header's `alg`.
    pub fn verify(&self, jwk: &Map<String, Value>) -> Result<(), JwsError> {
        let alg = self.header_str("alg").unwrap_or_default();
        verify_signature(alg, jwk, self.signing_input.as_bytes(), &self.signature)
    }
}

pub fn decode_compact(token: &str) -> Result<DecodedJws, JwsError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(JwsError::Malformed);
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(JwsError::Malformed);
    }
    Ok(DecodedJws {
        header: decode_object(header, "header")?,
        payload: decode_object(payload, "payload")?,
        signing_input: format!("{header}.{payload}"),
        signature: Base64UrlUnpadded::decode_vec(signature)
            .map_err(|_| JwsError::Encoding("signature"))?,
    })
}

/// `true` when the JWK carries no private or symmetric key material.
pub fn is_public_jwk(jwk: &Map<String, Value>) -> bool {
    !PRIVATE_JWK_MEMBERS.iter().any(|m| jwk.contains_key(*m))
}

/// Verify `signature` over `msg` with a public JWK.
pub fn verify_signature(
    alg: &str,
    jwk: &Map<String, Value>,
    msg: &[u8],
    signature: &[u8],
) -> Result<(), JwsError> {
    if !is_public_jwk(jwk) {
        return Err(JwsError::InvalidKey("private key material present"));
    }
    match alg {
        "ES256" => verify_es256(jwk, msg, signature),
        "EdDSA" => verify_eddsa(jwk, msg, signature),
        other => Err(JwsError::UnsupportedAlgorithm(other.to_owned())),
    }
}

// ES256: P-256 ECDSA, signature is the raw `r || s` concatenation.
fn verify_es256(jwk: &Map<String, Value>, msg: &[u8], sig: &[u8]) -> Result<(), JwsError> {
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::{Signature, VerifyingKey};

    if member(jwk, "kty") != Some("EC") || member(jwk, "crv") != Some("P-256") {
        return Err(JwsError::InvalidKey("ES256 requires an EC P-256 key"));
    }
    let x = key_bytes(jwk, "x")?;
    let y = key_bytes(jwk, "y")?;
    if x.len() != 32 || y.len() != 32 {
        return Err(JwsError::InvalidKey("P-256 coordinates must be 32 bytes"));
    }

    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04); // uncompressed
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);

    let key = VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|_| JwsError::InvalidKey("not a point on P-256"))?;
    let signature = Signature::from_slice(sig).map_err(|_| JwsError::BadSignature)?;
    key.verify(msg, &signature).map_err(|_| JwsError::BadSignature)
}

fn verify_eddsa(jwk: &Map<String, Value>, msg: &[u8], sig: &[u8]) -> Result<(), JwsError> {
    use ed25519_dalek::{Signature, VerifyingKey};

    if member(jwk, "kty") != Some("OKP") || member(jwk, "crv") != Some("Ed25519") {
        return Err(JwsError::InvalidKey("EdDSA requires an OKP Ed25519 key"));
    }
    let x: [u8; 32] = key_bytes(jwk, "x")?
        .try_into()
        .map_err(|_| JwsError::InvalidKey("Ed25519 public key must be 32 bytes"))?;

    let key = VerifyingKey::from_bytes(&x)
        .map_err(|_| JwsError::InvalidKey("not a valid Ed25519 public key"))?;
    let signature = Signature::from_slice(sig).map_err(|_| JwsError::BadSignature)?;
    key.verify_strict(msg, &signature)
        .map_err(|_| JwsError::BadSignature)
}

fn member<'a>(jwk: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    jwk.get(name).and_then(Value::as_str)
}

fn key_bytes(jwk: &Map<String, Value>, name: &'static str) -> Result<Vec<u8>, JwsError> {
    let encoded = member(jwk, name).ok_or(JwsError::InvalidKey("missing key coordinate"))?;
    Base64UrlUnpadded::decode_vec(encoded)
        .map_err(|_| JwsError::InvalidKey("key coordinate is not valid base64url"))
}

fn decode_object(segment: &str, name: &'static str) -> Result<Map<String, Value>, JwsError> {
    let bytes = Base64UrlUnpadded::decode_vec(segment).map_err(|_| JwsError::Encoding(name))?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(JwsError::NotAnObject(name)),
    }
}
