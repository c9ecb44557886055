//! # Access Tokens
//!
//! The bearer credential presented at the credential endpoint. Tokens are
//! created by an upstream grant flow and only ever read here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::ClaimsRequest;
use crate::scope::ScopeSet;

/// Audience restriction carried by a token. Either form forbids use at the
/// credential endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience value.
    One(String),
    /// Several audience values.
    Many(Vec<String>),
}

/// An access token as persisted by the token store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque token value presented by the caller.
    pub value: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Account the token acts for.
    pub account_id: String,
    /// Grant the token was minted under.
    pub grant_id: String,
    /// Granted scope values.
    #[serde(default)]
    pub scope: ScopeSet,
    /// JWK SHA-256 thumbprint of the DPoP key the token is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jkt: Option<String>,
    /// SHA-256 thumbprint of the mTLS client certificate the token is bound to.
    #[serde(
        rename = "x5t#S256",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub x5t_s256: Option<String>,
    /// Audience restriction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Claims request parameter captured at authorization time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<ClaimsRequest>,
    /// Token expiry; `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Whether the token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the token is bound to a proof-of-possession key.
    pub fn is_dpop_bound(&self) -> bool {
        self.jkt.is_some()
    }
}

// Custom Debug to keep the token value out of logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .field("account_id", &self.account_id)
            .field("grant_id", &self.grant_id)
            .field("scope", &self.scope.to_string())
            .field("jkt", &self.jkt)
            .field("x5t_s256", &self.x5t_s256)
            .field("aud", &self.aud)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
