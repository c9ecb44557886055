//! # Claims Requests
//!
//! The OIDC `claims` request parameter bound to an access token. Each section
//! maps a claim name to `null` (plain request) or an individual claim
//! request object (`essential`, `value`, `values`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::grant::Grant;

/// Which section of a claims request is being consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsClass {
    /// Claims released through userinfo-style responses, including credentials.
    Userinfo,
    /// Claims embedded in ID Tokens.
    IdToken,
}

impl ClaimsClass {
    /// The section name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Userinfo => "userinfo",
            Self::IdToken => "id_token",
        }
    }
}

/// Claims explicitly requested by the client at authorization time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimsRequest {
    /// Claims requested for the userinfo class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo: Option<Map<String, Value>>,
    /// Claims requested for the ID Token class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<Map<String, Value>>,
}

impl ClaimsRequest {
    /// The requested entries of `class`, if that section is present.
    pub fn section(&self, class: ClaimsClass) -> Option<&Map<String, Value>> {
        match class {
            ClaimsClass::Userinfo => self.userinfo.as_ref(),
            ClaimsClass::IdToken => self.id_token.as_ref(),
        }
    }
}

/// Keep the entries of the `class` section that the grant allows to be
/// released.
///
/// A missing claims request or section yields an empty mapping.
pub fn filter_claims(
    request: Option<&ClaimsRequest>,
    class: ClaimsClass,
    grant: &Grant,
) -> Map<String, Value> {
    let Some(section) = request.and_then(|r| r.section(class)) else {
        return Map::new();
    };
    let allowed = grant.oidc_claims_filtered(section.keys().map(String::as_str));
    section
        .iter()
        .filter(|(name, _)| allowed.contains(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
