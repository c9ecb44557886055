//! # Collaborators
//!
//! Everything the pipeline consults but does not own: persistence, replay
//! detection, certificate hashing, DPoP and key-proof verification, and the
//! credential-minting routine. Implementers wire their own backends by
//! implementing these traits; [`crate::reference`] ships in-memory and
//! JWS-verifying implementations for development.
//!
//! Lookups return `anyhow::Result`: an `Err` is an infrastructure failure and
//! surfaces as an opaque `server_error`, while `Ok(None)` means "not found"
//! and is turned into the appropriate OAuth error by the pipeline.

use std::collections::BTreeSet;
use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vci_core::{
    AccessToken, Account, ClaimsClass, Client, CredentialError, DpopProof, Grant, ScopeSet,
};

use crate::context::RequestContext;

/// Everything the credential endpoint needs from its host.
pub trait Provider:
    TokenStore
    + ClientStore
    + AccountResolver
    + GrantStore
    + ReplayDetection
    + CertificateThumbprint
    + DpopValidator
    + KeyProofVerifier
    + CredentialIssuer
    + Clone
{
}

/// Access token persistence.
pub trait TokenStore: Send + Sync {
    /// Find a token by its presented value. Expired tokens are not returned.
    fn find_token(&self, value: &str)
        -> impl Future<Output = Result<Option<AccessToken>>> + Send;
}

/// Client registry.
pub trait ClientStore: Send + Sync {
    /// Find a client by identifier.
    fn find_client(&self, client_id: &str) -> impl Future<Output = Result<Option<Client>>> + Send;
}

/// Account lookup and claim retrieval.
pub trait AccountResolver: Send + Sync {
    /// Resolve the account a token acts for.
    fn find_account(
        &self, ctx: &RequestContext, account_id: &str, token: &AccessToken,
    ) -> impl Future<Output = Result<Option<Account>>> + Send;

    /// Raw claim values for `account`. The result must carry `sub`.
    ///
    /// `scope`, `claims` and `rejected` are hints for backends that fetch
    /// claims lazily; the claims mask applies them regardless.
    fn account_claims(
        &self, account: &Account, class: ClaimsClass, scope: &ScopeSet,
        claims: &Map<String, Value>, rejected: &BTreeSet<String>,
    ) -> impl Future<Output = Result<Map<String, Value>>> + Send;
}

/// Grant persistence.
pub trait GrantStore: Send + Sync {
    /// Find a grant by identifier. With `ignore_expiration` an expired grant
    /// is still returned so the caller can report the expiry precisely.
    fn find_grant(
        &self, grant_id: &str, ignore_expiration: bool,
    ) -> impl Future<Output = Result<Option<Grant>>> + Send;
}

/// Single-use registry of proof identifiers.
pub trait ReplayDetection: Send + Sync {
    /// Register `(client_id, jti)` until `expires_at`. Returns `false` when
    /// the pair is already registered and unexpired as of `ctx.now`.
    ///
    /// Check and registration must be one atomic step.
    fn unique(
        &self, ctx: &RequestContext, client_id: &str, jti: &str, expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// `x5t#S256` computation over a presented client certificate.
pub trait CertificateThumbprint: Send + Sync {
    /// Thumbprint of a DER-encoded certificate.
    fn certificate_thumbprint(&self, certificate: &[u8]) -> String;
}

/// DPoP proof validation.
pub trait DpopValidator: Send + Sync {
    /// Validate the request's DPoP proof for `access_token`.
    ///
    /// Returns `Ok(None)` when the request carries no proof. Malformed or
    /// mismatched proofs fail with `invalid_dpop_proof` or `use_dpop_nonce`.
    fn validate_dpop(
        &self, ctx: &RequestContext, access_token: &str,
    ) -> impl Future<Output = Result<Option<DpopProof>, CredentialError>> + Send;
}

/// Outcome of verifying the credential request's key proof.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyProofVerification {
    /// Whether the proof was accepted.
    pub verified: bool,
    /// Verifier-specific details (holder key, nonce, ...) handed to the issuer.
    #[serde(default, flatten)]
    pub details: Map<String, Value>,
}

/// Verification of the proof of key possession in `credential_definition`.
pub trait KeyProofVerifier: Send + Sync {
    /// Verify the proof carried by the request.
    fn verify_key_proof(
        &self, ctx: &RequestContext,
    ) -> impl Future<Output = Result<KeyProofVerification>> + Send;
}

/// The credential-minting routine.
pub trait CredentialIssuer: Send + Sync {
    /// Mint a credential. The returned value is the response body verbatim.
    fn issue_credential(
        &self, ctx: &RequestContext, verification: &KeyProofVerification,
        userinfo: Map<String, Value>,
    ) -> impl Future<Output = Result<Value>> + Send;
}
