//! Verification of the OpenID4VCI `jwt` key proof.
//!
//! Accepts `{"proof_type": "jwt", "jwt": "<compact JWS>"}` whose header `typ`
//! is `openid4vci-proof+jwt`, whose `aud` names this issuer, and whose
//! signature verifies with the holder key. The key comes from the `jwk`
//! header or a `did:jwk` `kid`; other key references cannot be resolved here
//! and leave the proof unverified. The holder key is passed on to the
//! credential issuer.

use anyhow::Result;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::RequestContext;
use crate::jws::decode_compact;
use crate::provider::{KeyProofVerification, KeyProofVerifier};

const DID_JWK: &str = "did:jwk:";

#[derive(Debug, Clone)]
pub struct JwtKeyProofVerifier {
    issuer: String,
}

impl JwtKeyProofVerifier {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    fn check(&self, proof: &Value) -> Option<Map<String, Value>> {
        let proof = proof.as_object()?;
        if proof.get("proof_type")?.as_str()? != "jwt" {
            return None;
        }
        let jws = decode_compact(proof.get("jwt")?.as_str()?).ok()?;
        if jws.header_str("typ")? != "openid4vci-proof+jwt" {
            return None;
        }

        let (holder_key, jwk) = match (jws.header.get("jwk"), jws.header_str("kid")) {
            (Some(Value::Object(jwk)), _) => (Value::Object(jwk.clone()), jwk.clone()),
            (None, Some(kid)) => (Value::String(kid.to_owned()), resolve_did_jwk(kid)?),
            _ => return None,
        };
        if let Err(e) = jws.verify(&jwk) {
            debug!(error = %e, "key proof signature rejected");
            return None;
        }

        let audience_ok = match jws.payload.get("aud")? {
            Value::String(aud) => aud == &self.issuer,
            Value::Array(auds) => auds.iter().any(|a| a.as_str() == Some(self.issuer.as_str())),
            _ => false,
        };
        if !audience_ok || !jws.payload.get("iat")?.is_i64() {
            return None;
        }

        let mut details = Map::new();
        details.insert("holder_key".to_string(), holder_key);
        if let Some(nonce) = jws.payload.get("nonce") {
            details.insert("nonce".to_string(), nonce.clone());
        }
        Some(details)
    }
}

/// The JWK embedded in a `did:jwk` identifier, fragment ignored.
fn resolve_did_jwk(kid: &str) -> Option<Map<String, Value>> {
    let encoded = kid.strip_prefix(DID_JWK)?.split('#').next()?;
    let bytes = Base64UrlUnpadded::decode_vec(encoded).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(jwk) => Some(jwk),
        _ => None,
    }
}

impl KeyProofVerifier for JwtKeyProofVerifier {
    async fn verify_key_proof(&self, ctx: &RequestContext) -> Result<KeyProofVerification> {
        let proof = ctx.credential_definition()?.proof.as_ref();
        match proof.and_then(|p| self.check(p)) {
            Some(details) => Ok(KeyProofVerification {
                verified: true,
                details,
            }),
            None => {
                debug!("key proof rejected");
                Ok(KeyProofVerification::default())
            }
        }
    }
}
