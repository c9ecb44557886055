//! Unsigned W3C credential skeletons.
//!
//! Builds the credential body from the requested definition and the released
//! claims. Signing belongs to the deployment's issuance service.

use anyhow::Result;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::SecondsFormat;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::provider::{CredentialIssuer, KeyProofVerification};

#[derive(Debug, Clone)]
pub struct UnsignedCredentialIssuer {
    issuer: String,
}

impl UnsignedCredentialIssuer {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }
}

impl CredentialIssuer for UnsignedCredentialIssuer {
    async fn issue_credential(
        &self, ctx: &RequestContext, verification: &KeyProofVerification,
        userinfo: Map<String, Value>,
    ) -> Result<Value> {
        let definition = ctx.credential_definition()?;

        let mut subject = userinfo;
        if let Some(did) = verification.details.get("holder_key").and_then(holder_did) {
            subject.insert("id".to_string(), Value::String(did));
        }

        Ok(json!({
            "format": ctx.params.format,
            "credential": {
                "@context": definition.context,
                "id": format!("urn:uuid:{}", Uuid::new_v4()),
                "type": definition.types,
                "issuer": self.issuer,
                "issuanceDate": ctx.now.to_rfc3339_opts(SecondsFormat::Secs, true),
                "credentialSubject": subject,
            }
        }))
    }
}

/// Subject identifier for the proven holder key: the DID of a `kid`, or a
/// `did:jwk` for an embedded JWK.
fn holder_did(holder_key: &Value) -> Option<String> {
    match holder_key {
        Value::String(kid) => kid
            .split('#')
            .next()
            .filter(|d| d.starts_with("did:"))
            .map(str::to_owned),
        Value::Object(_) => Some(format!(
            "did:jwk:{}",
            Base64UrlUnpadded::encode_string(holder_key.to_string().as_bytes())
        )),
        _ => None,
    }
}
