//! # Request Normalizer
//!
//! Parses the JSON body into [`CredentialParams`]. Only `scope`, `format` and
//! `credential_definition` are recognized; anything else is dropped.
//!
//! `serde_json` keeps the last occurrence of a repeated key, which would hide
//! a duplicated parameter. The body is therefore read through a visitor that
//! records every raw occurrence first, and duplicates are rejected before the
//! entries collapse into the final parameter set.

use std::fmt;

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::Value;
use tracing::debug;
use vci_core::CredentialError;

use crate::context::IncomingRequest;

/// Parameters recognized at the credential endpoint.
pub const PARAM_LIST: [&str; 3] = ["scope", "format", "credential_definition"];

/// Recognized body parameters of a credential request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialParams {
    /// Requested scope, space-delimited. Never empty when present.
    pub scope: Option<String>,
    /// Requested credential format.
    pub format: Option<String>,
    /// Raw `credential_definition` value.
    pub credential_definition: Option<Value>,
}

/// Every occurrence of a recognized key, in document order.
struct RawParams(Vec<(String, Value)>);

struct RawParamsVisitor;

impl<'de> Visitor<'de> for RawParamsVisitor {
    type Value = RawParams;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawParams, A::Error> {
        let mut entries = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if PARAM_LIST.contains(&key.as_str()) {
                let value = map.next_value::<Value>()?;
                entries.push((key, value));
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(RawParams(entries))
    }
}

impl<'de> Deserialize<'de> for RawParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawParamsVisitor)
    }
}

/// Parse and normalize the request body.
///
/// An empty body yields empty parameters; the shape validator reports what
/// is missing.
pub fn normalize(request: &IncomingRequest) -> Result<CredentialParams, CredentialError> {
    if request.body.is_empty() {
        return Ok(CredentialParams::default());
    }

    if !is_json(request.content_type.as_deref()) {
        return Err(CredentialError::invalid_request(
            "only application/json content-type bodies are supported",
        ));
    }

    let RawParams(entries) = serde_json::from_slice(&request.body).map_err(|e| {
        debug!(error = %e, "credential request body rejected");
        CredentialError::invalid_request("failed to parse the request body")
    })?;

    for name in PARAM_LIST {
        if entries.iter().filter(|(key, _)| key == name).count() > 1 {
            return Err(CredentialError::invalid_request(format!(
                "'{name}' parameter must only be provided once"
            )));
        }
    }

    let mut params = CredentialParams::default();
    for (key, value) in entries {
        match key.as_str() {
            "scope" => params.scope = string_param("scope", value)?.filter(|s| !s.is_empty()),
            "format" => params.format = string_param("format", value)?,
            "credential_definition" => {
                params.credential_definition = Some(value).filter(|v| !v.is_null())
            }
            _ => {}
        }
    }
    Ok(params)
}

fn string_param(name: &str, value: Value) -> Result<Option<String>, CredentialError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(CredentialError::invalid_request(format!(
            "'{name}' parameter must be a string"
        ))),
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
