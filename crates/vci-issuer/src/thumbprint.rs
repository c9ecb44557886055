//! # Thumbprints
//!
//! SHA-256 thumbprints used for token binding: `x5t#S256` over a DER client
//! certificate (RFC 8705 §3.1) and the JWK thumbprint (RFC 7638) behind
//! `jkt`. Both are unpadded base64url.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::provider::CertificateThumbprint;

/// Unpadded base64url SHA-256 digest of `bytes`.
pub fn sha256_b64url(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(bytes))
}

/// `x5t#S256` over the DER encoding of a certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256CertificateThumbprint;

impl CertificateThumbprint for Sha256CertificateThumbprint {
    fn certificate_thumbprint(&self, certificate: &[u8]) -> String {
        sha256_b64url(certificate)
    }
}

/// Errors computing a JWK thumbprint.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JwkError {
    #[error("unsupported JWK key type")]
    UnsupportedKeyType,

    #[error("JWK is missing the required '{0}' member")]
    MissingMember(&'static str),
}

/// RFC 7638 SHA-256 thumbprint of a public JWK.
///
/// Only the required members of the key type take part, serialized in
/// lexicographic order without whitespace.
pub fn jwk_thumbprint(jwk: &Map<String, Value>) -> Result<String, JwkError> {
    let required: &[&'static str] = match jwk.get("kty").and_then(Value::as_str) {
        Some("EC") => &["crv", "kty", "x", "y"],
        Some("RSA") => &["e", "kty", "n"],
        Some("OKP") => &["crv", "kty", "x"],
        Some("oct") => &["k", "kty"],
        _ => return Err(JwkError::UnsupportedKeyType),
    };

    let mut members = Vec::with_capacity(required.len());
    for &name in required {
        let value = jwk
            .get(name)
            .and_then(Value::as_str)
            .ok_or(JwkError::MissingMember(name))?;
        // Serializing a &str cannot fail.
        let quoted = serde_json::to_string(value).unwrap_or_default();
        members.push(format!("\"{name}\":{quoted}"));
    }
    let canonical = format!("{{{}}}", members.join(","));
    Ok(sha256_b64url(canonical.as_bytes()))
}
