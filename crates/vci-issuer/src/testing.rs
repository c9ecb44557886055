//! Controllable provider and fixtures for unit tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use ed25519_dalek::Signer as _;
use p256::ecdsa::signature::Signer as _;
use serde_json::{json, Map, Value};
use vci_core::{
    AccessToken, Account, ClaimsClass, Client, CredentialError, DpopProof, Grant, GrantRejections,
    OidcGrant, ScopeSet, SupportedCredentialConfig,
};

use crate::config::IssuerConfig;
use crate::context::{IncomingRequest, RequestContext};
use crate::memory::{MemoryStore, ReplayCache};
use crate::provider::{
    AccountResolver, CertificateThumbprint, ClientStore, CredentialIssuer, DpopValidator,
    GrantStore, KeyProofVerification, KeyProofVerifier, Provider, ReplayDetection, TokenStore,
};
use crate::thumbprint::sha256_b64url;

const W3C_V1: &str = "https://www.w3.org/2018/credentials/v1";
const EXAMPLES_V1: &str = "https://www.w3.org/2018/credentials/examples/v1";

pub fn supported_credentials() -> Vec<SupportedCredentialConfig> {
    vec![
        SupportedCredentialConfig {
            id: Some("UniversityDegree".into()),
            format: "jwt_vc_json".into(),
            context: vec![W3C_V1.into(), EXAMPLES_V1.into()],
            types: vec!["VerifiableCredential".into(), "UniversityDegreeCredential".into()],
            credential_subject: json!({"given_name": {}, "family_name": {}, "degree": {}})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
        SupportedCredentialConfig {
            id: Some("DriverLicense".into()),
            format: "jwt_vc_json".into(),
            context: vec![W3C_V1.into()],
            types: vec!["VerifiableCredential".into(), "DriverLicenseCredential".into()],
            credential_subject: json!({"license_number": {}})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
    ]
}

pub fn degree_definition() -> Value {
    json!({
        "@context": [W3C_V1, EXAMPLES_V1],
        "type": ["VerifiableCredential", "UniversityDegreeCredential"],
        "credentialSubject": {"given_name": {}, "family_name": {}, "degree": {}},
        "proof": {"proof_type": "jwt", "jwt": "h.p.s"}
    })
}

pub fn credential_body() -> Value {
    json!({"format": "jwt_vc_json", "credential_definition": degree_definition()})
}

pub fn fixture_token(value: &str) -> AccessToken {
    AccessToken {
        value: value.into(),
        client_id: "wallet".into(),
        account_id: "alice".into(),
        grant_id: "grant-1".into(),
        scope: ScopeSet::parse("openid UniversityDegree email"),
        jkt: None,
        x5t_s256: None,
        aud: None,
        claims: None,
        expires_at: None,
    }
}

pub fn fixture_grant() -> Grant {
    Grant {
        grant_id: "grant-1".into(),
        client_id: "wallet".into(),
        account_id: "alice".into(),
        expires_at: None,
        openid: Some(OidcGrant {
            scope: ScopeSet::parse("openid UniversityDegree email"),
            claims: BTreeSet::new(),
        }),
        rejected: GrantRejections::default(),
    }
}

pub fn dpop_request(token: &str) -> IncomingRequest {
    IncomingRequest {
        method: "POST".into(),
        authorization: Some(format!("DPoP {token}")),
        dpop: vec!["proof".into()],
        ..Default::default()
    }
}

// ── Holder keys ─────────────────────────────────────────────────────

/// A fixed holder signing key for building real proof JWTs.
pub enum HolderKey {
    Es256(p256::ecdsa::SigningKey),
    EdDsa(ed25519_dalek::SigningKey),
}

impl HolderKey {
    pub fn es256() -> Self {
        Self::Es256(p256::ecdsa::SigningKey::from_slice(&[7u8; 32]).unwrap())
    }

    pub fn ed25519() -> Self {
        Self::EdDsa(ed25519_dalek::SigningKey::from_bytes(&[9u8; 32]))
    }

    pub fn alg(&self) -> &'static str {
        match self {
            Self::Es256(_) => "ES256",
            Self::EdDsa(_) => "EdDSA",
        }
    }

    /// The public JWK.
    pub fn jwk(&self) -> Value {
        match self {
            Self::Es256(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                json!({
                    "kty": "EC",
                    "crv": "P-256",
                    "x": Base64UrlUnpadded::encode_string(point.x().unwrap().as_slice()),
                    "y": Base64UrlUnpadded::encode_string(point.y().unwrap().as_slice()),
                })
            }
            Self::EdDsa(key) => json!({
                "kty": "OKP",
                "crv": "Ed25519",
                "x": Base64UrlUnpadded::encode_string(key.verifying_key().as_bytes()),
            }),
        }
    }

    /// Compact JWS over `header` (with `alg` filled in) and `claims`.
    pub fn sign(&self, mut header: Value, claims: &Value) -> String {
        header["alg"] = json!(self.alg());
        let input = format!(
            "{}.{}",
            Base64UrlUnpadded::encode_string(header.to_string().as_bytes()),
            Base64UrlUnpadded::encode_string(claims.to_string().as_bytes()),
        );
        let signature = match self {
            Self::Es256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(input.as_bytes());
                signature.to_bytes().to_vec()
            }
            Self::EdDsa(key) => key.sign(input.as_bytes()).to_bytes().to_vec(),
        };
        format!("{input}.{}", Base64UrlUnpadded::encode_string(&signature))
    }
}

#[derive(Default)]
struct Switches {
    key_proof_rejected: AtomicBool,
    strip_sub: AtomicBool,
    fail_clients: AtomicBool,
    token_lookups: AtomicUsize,
    entity_lookups: AtomicUsize,
    issued: AtomicUsize,
}

/// Provider backed by [`MemoryStore`] with scripted DPoP results and call
/// counters.
#[derive(Clone)]
pub struct TestProvider {
    pub config: IssuerConfig,
    pub store: MemoryStore,
    replay: ReplayCache,
    dpop: Arc<Mutex<Option<DpopProof>>>,
    switches: Arc<Switches>,
}

impl TestProvider {
    pub fn new() -> Self {
        Self {
            config: IssuerConfig {
                issuer: "https://issuer.example".into(),
                credentials_supported: supported_credentials(),
                ..Default::default()
            },
            store: MemoryStore::new(),
            replay: ReplayCache::new(),
            dpop: Arc::new(Mutex::new(None)),
            switches: Arc::new(Switches::default()),
        }
    }

    /// Token `tok`, client `wallet`, account `alice` and grant `grant-1`.
    pub fn seeded() -> Self {
        let provider = Self::new();
        provider.store.insert_token(fixture_token("tok"));
        provider.store.insert_client(Client {
            client_id: "wallet".into(),
            metadata: Map::new(),
        });
        provider.store.insert_account(Account {
            account_id: "alice".into(),
            claims: json!({
                "email": "alice@example.com",
                "email_verified": true,
                "given_name": "Alice",
                "family_name": "Liddell"
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
        });
        provider.store.insert_grant(fixture_grant());
        provider
    }

    pub fn set_dpop(&self, proof: Option<DpopProof>) {
        *self.dpop.lock().unwrap() = proof;
    }

    pub fn set_key_proof_verified(&self, verified: bool) {
        self.switches.key_proof_rejected.store(!verified, Ordering::SeqCst);
    }

    pub fn set_strip_sub(&self, strip: bool) {
        self.switches.strip_sub.store(strip, Ordering::SeqCst);
    }

    pub fn fail_client_lookups(&self) {
        self.switches.fail_clients.store(true, Ordering::SeqCst);
    }

    pub fn update_token(&self, value: &str, f: impl FnOnce(&mut AccessToken)) {
        let mut token = self.store.token(value).unwrap();
        f(&mut token);
        self.store.insert_token(token);
    }

    pub fn bind_token(&self, value: &str, jkt: &str) {
        self.update_token(value, |t| t.jkt = Some(jkt.into()));
    }

    pub fn thumbprint_of(&self, certificate: &[u8]) -> String {
        sha256_b64url(certificate)
    }

    pub fn token_lookups(&self) -> usize {
        self.switches.token_lookups.load(Ordering::SeqCst)
    }

    pub fn entity_lookups(&self) -> usize {
        self.switches.entity_lookups.load(Ordering::SeqCst)
    }

    pub fn issued(&self) -> usize {
        self.switches.issued.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> (Option<AccessToken>, Option<Client>, Option<Account>, Option<Grant>) {
        (
            self.store.token("tok"),
            self.store.client("wallet"),
            self.store.account("alice"),
            self.store.grant("grant-1"),
        )
    }
}

impl Provider for TestProvider {}

impl TokenStore for TestProvider {
    async fn find_token(&self, value: &str) -> Result<Option<AccessToken>> {
        self.switches.token_lookups.fetch_add(1, Ordering::SeqCst);
        self.store.find_token(value).await
    }
}

impl ClientStore for TestProvider {
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        self.switches.entity_lookups.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_clients.load(Ordering::SeqCst) {
            bail!("client registry unavailable");
        }
        self.store.find_client(client_id).await
    }
}

impl AccountResolver for TestProvider {
    async fn find_account(
        &self, ctx: &RequestContext, account_id: &str, token: &AccessToken,
    ) -> Result<Option<Account>> {
        self.switches.entity_lookups.fetch_add(1, Ordering::SeqCst);
        self.store.find_account(ctx, account_id, token).await
    }

    async fn account_claims(
        &self, account: &Account, class: ClaimsClass, scope: &ScopeSet,
        claims: &Map<String, Value>, rejected: &BTreeSet<String>,
    ) -> Result<Map<String, Value>> {
        if self.switches.strip_sub.load(Ordering::SeqCst) {
            return Ok(account.claims.clone());
        }
        self.store
            .account_claims(account, class, scope, claims, rejected)
            .await
    }
}

impl GrantStore for TestProvider {
    async fn find_grant(&self, grant_id: &str, ignore_expiration: bool) -> Result<Option<Grant>> {
        self.switches.entity_lookups.fetch_add(1, Ordering::SeqCst);
        self.store.find_grant(grant_id, ignore_expiration).await
    }
}

impl ReplayDetection for TestProvider {
    async fn unique(
        &self, ctx: &RequestContext, client_id: &str, jti: &str, expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.replay.unique(ctx, client_id, jti, expires_at).await
    }
}

impl CertificateThumbprint for TestProvider {
    fn certificate_thumbprint(&self, certificate: &[u8]) -> String {
        sha256_b64url(certificate)
    }
}

impl DpopValidator for TestProvider {
    async fn validate_dpop(
        &self, ctx: &RequestContext, _access_token: &str,
    ) -> Result<Option<DpopProof>, CredentialError> {
        if ctx.request.dpop.is_empty() {
            return Ok(None);
        }
        Ok(self.dpop.lock().unwrap().clone())
    }
}

impl KeyProofVerifier for TestProvider {
    async fn verify_key_proof(&self, _ctx: &RequestContext) -> Result<KeyProofVerification> {
        Ok(KeyProofVerification {
            verified: !self.switches.key_proof_rejected.load(Ordering::SeqCst),
            details: Map::new(),
        })
    }
}

impl CredentialIssuer for TestProvider {
    async fn issue_credential(
        &self, ctx: &RequestContext, _verification: &KeyProofVerification,
        userinfo: Map<String, Value>,
    ) -> Result<Value> {
        self.switches.issued.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"format": ctx.params.format, "userinfo": userinfo}))
    }
}
