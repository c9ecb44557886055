//! # Credential Shapes
//!
//! [`SupportedCredentialConfig`] is the issuer-side descriptor of something the
//! endpoint can mint; [`CredentialDefinition`] is what the caller asked for.
//!
//! Supported configurations come from trusted configuration and deserialize
//! strictly. Credential definitions come from the wire and are read leniently:
//! a field of the wrong JSON type, or a list with any non-string item, is
//! treated as absent, so the shape validator reports it the same way it
//! reports a missing field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A credential the issuer is configured to mint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportedCredentialConfig {
    /// Scope value that authorizes this credential, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Credential format identifier, e.g. `jwt_vc_json`.
    pub format: String,
    /// JSON-LD contexts a request must include.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Credential types a request must include.
    pub types: Vec<String>,
    /// Subject claim descriptors a request must reproduce exactly.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: Map<String, Value>,
}

/// The shape of the credential a caller requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialDefinition {
    /// Requested `@context` values, in request order.
    pub context: Option<Vec<String>>,
    /// Requested `type` values, in request order.
    pub types: Option<Vec<String>>,
    /// Requested subject claim descriptors.
    pub credential_subject: Option<Map<String, Value>>,
    /// Proof of key possession, forwarded to the key proof verifier.
    pub proof: Option<Value>,
}

impl CredentialDefinition {
    /// Read a definition from the raw `credential_definition` parameter.
    ///
    /// A non-object value yields a definition with every field absent.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self {
            context: object.get("@context").and_then(string_list),
            types: object.get("type").and_then(string_list),
            credential_subject: object.get("credentialSubject").and_then(|v| v.as_object().cloned()),
            proof: object.get("proof").filter(|v| !v.is_null()).cloned(),
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect()
}
