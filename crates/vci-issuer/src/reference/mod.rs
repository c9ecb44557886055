//! # Reference Provider
//!
//! A complete [`Provider`] for development deployments and end-to-end tests:
//! in-memory stores and replay cache, SHA-256 certificate thumbprints,
//! signature-verified DPoP and key proofs (`ES256`, `EdDSA`), and unsigned
//! credential skeletons.
//!
//! Production deployments replace [`UnsignedCredentialIssuer`] with their
//! signing service.

mod dpop;
mod issuance;
mod key_proof;

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use vci_core::{
    AccessToken, Account, ClaimsClass, Client, CredentialError, DpopProof, Grant, ScopeSet,
};

pub use dpop::JwsDpopValidator;
pub use issuance::UnsignedCredentialIssuer;
pub use key_proof::JwtKeyProofVerifier;

use crate::config::IssuerConfig;
use crate::context::RequestContext;
use crate::memory::{MemoryStore, ReplayCache};
use crate::provider::{
    AccountResolver, CertificateThumbprint, ClientStore, CredentialIssuer, DpopValidator,
    GrantStore, KeyProofVerification, KeyProofVerifier, Provider, ReplayDetection, TokenStore,
};
use crate::thumbprint::Sha256CertificateThumbprint;

#[derive(Debug, Clone)]
pub struct ReferenceProvider {
    store: MemoryStore,
    replay: ReplayCache,
    thumbprint: Sha256CertificateThumbprint,
    dpop: JwsDpopValidator,
    key_proof: JwtKeyProofVerifier,
    issuer: UnsignedCredentialIssuer,
}

impl ReferenceProvider {
    pub fn new(config: &IssuerConfig, store: MemoryStore) -> Self {
        Self {
            store,
            replay: ReplayCache::new(),
            thumbprint: Sha256CertificateThumbprint,
            dpop: JwsDpopValidator::new(config),
            key_proof: JwtKeyProofVerifier::new(config.issuer.clone()),
            issuer: UnsignedCredentialIssuer::new(config.issuer.clone()),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn replay_cache(&self) -> &ReplayCache {
        &self.replay
    }
}

impl Provider for ReferenceProvider {}

impl TokenStore for ReferenceProvider {
    async fn find_token(&self, value: &str) -> Result<Option<AccessToken>> {
        self.store.find_token(value).await
    }
}

impl ClientStore for ReferenceProvider {
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        self.store.find_client(client_id).await
    }
}

impl AccountResolver for ReferenceProvider {
    async fn find_account(
        &self, ctx: &RequestContext, account_id: &str, token: &AccessToken,
    ) -> Result<Option<Account>> {
        self.store.find_account(ctx, account_id, token).await
    }

    async fn account_claims(
        &self, account: &Account, class: ClaimsClass, scope: &ScopeSet,
        claims: &Map<String, Value>, rejected: &BTreeSet<String>,
    ) -> Result<Map<String, Value>> {
        self.store
            .account_claims(account, class, scope, claims, rejected)
            .await
    }
}

impl GrantStore for ReferenceProvider {
    async fn find_grant(&self, grant_id: &str, ignore_expiration: bool) -> Result<Option<Grant>> {
        self.store.find_grant(grant_id, ignore_expiration).await
    }
}

impl ReplayDetection for ReferenceProvider {
    async fn unique(
        &self, ctx: &RequestContext, client_id: &str, jti: &str, expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.replay.unique(ctx, client_id, jti, expires_at).await
    }
}

impl CertificateThumbprint for ReferenceProvider {
    fn certificate_thumbprint(&self, certificate: &[u8]) -> String {
        self.thumbprint.certificate_thumbprint(certificate)
    }
}

impl DpopValidator for ReferenceProvider {
    async fn validate_dpop(
        &self, ctx: &RequestContext, access_token: &str,
    ) -> Result<Option<DpopProof>, CredentialError> {
        self.dpop.validate_dpop(ctx, access_token).await
    }
}

impl KeyProofVerifier for ReferenceProvider {
    async fn verify_key_proof(&self, ctx: &RequestContext) -> Result<KeyProofVerification> {
        self.key_proof.verify_key_proof(ctx).await
    }
}

impl CredentialIssuer for ReferenceProvider {
    async fn issue_credential(
        &self, ctx: &RequestContext, verification: &KeyProofVerification,
        userinfo: Map<String, Value>,
    ) -> Result<Value> {
        self.issuer
            .issue_credential(ctx, verification, userinfo)
            .await
    }
}
