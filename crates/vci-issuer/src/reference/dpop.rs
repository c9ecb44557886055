//! DPoP proof validation (RFC 9449 §4.3).
//!
//! Checks the header `typ`, `alg` and public `jwk`, verifies the signature
//! with that `jwk`, then checks the `jti`, `htm`, `htu`, `iat` and `ath`
//! claims. The returned thumbprint is only trusted once the signature holds.

use chrono::Duration;
use serde_json::Value;
use subtle::ConstantTimeEq;
use url::Url;
use vci_core::{CredentialError, DpopProof};

use crate::config::IssuerConfig;
use crate::context::RequestContext;
use crate::jws::{decode_compact, is_public_jwk};
use crate::provider::DpopValidator;
use crate::thumbprint::{jwk_thumbprint, sha256_b64url};

#[derive(Debug, Clone)]
pub struct JwsDpopValidator {
    allowed_algs: Vec<String>,
    iat_tolerance: Duration,
}

impl JwsDpopValidator {
    pub fn new(config: &IssuerConfig) -> Self {
        Self {
            allowed_algs: config.dpop_signing_alg_values.clone(),
            iat_tolerance: Duration::seconds(config.dpop.iat_tolerance_secs),
        }
    }

    fn check(
        &self,
        proof: &str,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<DpopProof, CredentialError> {
        let jws = decode_compact(proof)
            .map_err(|e| invalid(format!("invalid DPoP proof JWT: {e}")))?;

        if jws.header_str("typ") != Some("dpop+jwt") {
            return Err(invalid("DPoP proof JWT typ header must be dpop+jwt"));
        }
        let alg = jws.header_str("alg").unwrap_or_default();
        if !self.allowed_algs.iter().any(|a| a == alg) {
            return Err(invalid("unsupported DPoP proof JWT alg"));
        }
        let jwk = jws
            .header
            .get("jwk")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("DPoP proof JWT jwk header must be a JSON object"))?;
        if !is_public_jwk(jwk) {
            return Err(invalid("DPoP proof JWT jwk header must be a public key"));
        }
        jws.verify(jwk)
            .map_err(|e| invalid(format!("failed to verify DPoP proof JWT signature: {e}")))?;

        let jti = jws
            .claim_str("jti")
            .filter(|j| !j.is_empty())
            .ok_or_else(|| invalid("DPoP proof JWT must have a jti string claim"))?;

        if jws.claim_str("htm") != Some(ctx.request.method.as_str()) {
            return Err(invalid("DPoP proof JWT htm mismatch"));
        }

        let htu = jws.claim_str("htu").and_then(normalize_htu);
        if htu.is_none() || htu != normalize_htu(&ctx.request.url) {
            return Err(invalid("DPoP proof JWT htu mismatch"));
        }

        let iat = jws
            .payload
            .get("iat")
            .and_then(Value::as_i64)
            .ok_or_else(|| invalid("DPoP proof JWT must have an iat claim"))?;
        if (ctx.now.timestamp() - iat).abs() > self.iat_tolerance.num_seconds() {
            return Err(invalid("DPoP proof JWT iat is not recent enough"));
        }

        let expected_ath = sha256_b64url(access_token.as_bytes());
        let ath_ok = jws
            .claim_str("ath")
            .is_some_and(|ath| bool::from(ath.as_bytes().ct_eq(expected_ath.as_bytes())));
        if !ath_ok {
            return Err(invalid("DPoP proof JWT ath mismatch"));
        }

        let thumbprint =
            jwk_thumbprint(jwk).map_err(|e| invalid(format!("invalid DPoP proof JWT jwk: {e}")))?;

        Ok(DpopProof {
            jti: jti.to_owned(),
            thumbprint,
            iat,
        })
    }
}

impl DpopValidator for JwsDpopValidator {
    async fn validate_dpop(
        &self, ctx: &RequestContext, access_token: &str,
    ) -> Result<Option<DpopProof>, CredentialError> {
        match ctx.request.dpop.as_slice() {
            [] => Ok(None),
            [proof] => self.check(proof, ctx, access_token).map(Some),
            _ => Err(invalid("multiple DPoP headers provided")),
        }
    }
}

fn invalid(description: impl Into<String>) -> CredentialError {
    CredentialError::invalid_dpop_proof(description)
}

/// The request URI without query and fragment.
fn normalize_htu(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}
