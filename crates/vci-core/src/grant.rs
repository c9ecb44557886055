//! # Grants
//!
//! The persisted record of an account's consent to a client. The grant caps
//! which OIDC scopes and claims may be released and remembers the ones the
//! end-user explicitly rejected.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scope::ScopeSet;

/// OIDC scopes and claims granted to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OidcGrant {
    /// Granted OIDC scope values.
    #[serde(default)]
    pub scope: ScopeSet,
    /// Granted claim names (from the claims request parameter).
    #[serde(default)]
    pub claims: BTreeSet<String>,
}

/// Scopes and claims the end-user declined to release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrantRejections {
    /// Rejected OIDC scope values.
    #[serde(default)]
    pub scope: ScopeSet,
    /// Rejected claim names.
    #[serde(default)]
    pub claims: BTreeSet<String>,
}

/// An account's consent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    /// Grant identifier referenced by access tokens.
    pub grant_id: String,
    /// Client the consent was given to.
    pub client_id: String,
    /// Account that gave consent.
    pub account_id: String,
    /// Expiry of the grant itself; `None` never expires.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted OIDC scopes and claims.
    #[serde(default)]
    pub openid: Option<OidcGrant>,
    /// Scopes and claims the end-user rejected.
    #[serde(default)]
    pub rejected: GrantRejections,
}

impl Grant {
    /// Whether the grant has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Claim names the end-user rejected.
    pub fn rejected_oidc_claims(&self) -> BTreeSet<String> {
        self.rejected.claims.clone()
    }

    /// Restrict `requested` to the granted OIDC scopes, minus rejected ones.
    pub fn oidc_scope_filtered(&self, requested: &ScopeSet) -> ScopeSet {
        let Some(openid) = &self.openid else {
            return ScopeSet::new();
        };
        requested
            .iter()
            .filter(|s| openid.scope.contains(s) && !self.rejected.scope.contains(s))
            .collect()
    }

    /// Restrict `requested` claim names to the granted ones, minus rejected
    /// ones.
    pub fn oidc_claims_filtered<'a>(
        &self,
        requested: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<String> {
        let Some(openid) = &self.openid else {
            return BTreeSet::new();
        };
        requested
            .into_iter()
            .filter(|c| openid.claims.contains(*c) && !self.rejected.claims.contains(*c))
            .map(str::to_owned)
            .collect()
    }
}
