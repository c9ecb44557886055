//! Shared harness: a router over the reference provider, seeded fixtures,
//! and builders for DPoP proofs and key proofs signed with the holder's
//! ES256 key.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use http_body_util::BodyExt;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use serde_json::{json, Value};
use tower::ServiceExt;
use vci_api::middleware::metrics::ApiMetrics;
use vci_api::state::{AppConfig, AppState};
use vci_core::{AccessToken, ScopeSet};
use vci_issuer::thumbprint::{jwk_thumbprint, sha256_b64url};
use vci_issuer::{CredentialEndpoint, Fixtures, IssuerConfig, MemoryStore, ReferenceProvider};

pub const ISSUER: &str = "https://issuer.example";
pub const CREDENTIAL_URL: &str = "https://issuer.example/credential";
pub const W3C_V1: &str = "https://www.w3.org/2018/credentials/v1";
pub const EXAMPLES_V1: &str = "https://www.w3.org/2018/credentials/examples/v1";

const ISSUER_YAML: &str = r#"
issuer: https://issuer.example
dpop_signing_alg_values: [ES256, EdDSA]
credentials_supported:
  - id: UniversityDegree
    format: jwt_vc_json
    "@context":
      - https://www.w3.org/2018/credentials/v1
      - https://www.w3.org/2018/credentials/examples/v1
    types: [VerifiableCredential, UniversityDegreeCredential]
    credentialSubject:
      given_name: {}
      family_name: {}
      degree: {}
  - id: DriverLicense
    format: jwt_vc_json
    "@context": [https://www.w3.org/2018/credentials/v1]
    types: [VerifiableCredential, DriverLicenseCredential]
    credentialSubject:
      license_number: {}
"#;

const FIXTURES_YAML: &str = r#"
clients:
  - client_id: wallet
    client_name: Example Wallet
accounts:
  - account_id: alice
    claims:
      email: alice@example.com
      email_verified: true
      given_name: Alice
      family_name: Liddell
  - account_id: bob
    claims:
      given_name: Bob
grants:
  - grant_id: grant-1
    client_id: wallet
    account_id: alice
    openid:
      scope: openid UniversityDegree email
  - grant_id: grant-bob
    client_id: wallet
    account_id: bob
    openid:
      scope: openid UniversityDegree
"#;

/// A running endpoint plus a handle on its stores.
pub struct Harness {
    pub router: Router,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        let issuer = IssuerConfig::from_yaml_str(ISSUER_YAML).unwrap();
        let store = MemoryStore::from_fixtures(Fixtures::from_yaml_str(FIXTURES_YAML).unwrap());
        let provider = ReferenceProvider::new(&issuer, store);
        let config = AppConfig {
            public_url: Some(ISSUER.to_string()),
            trust_client_cert_header: true,
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            CredentialEndpoint::new(provider, Arc::new(issuer)),
            ApiMetrics::new().unwrap(),
        );
        Self {
            router: vci_api::app(state.clone()),
            state,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        self.state.endpoint.provider().store()
    }

    pub fn insert_token(&self, token: AccessToken) {
        self.store().insert_token(token);
    }

    pub async fn send(&self, request: Request<Body>) -> (u16, Option<String>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        read(response).await
    }
}

async fn read(response: Response<Body>) -> (u16, Option<String>, Value) {
    let status = response.status().as_u16();
    let challenge = response
        .headers()
        .get("www-authenticate")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, challenge, body)
}

/// An access token for alice under `grant-1`, unbound.
pub fn token(value: &str, scope: &str) -> AccessToken {
    AccessToken {
        value: value.into(),
        client_id: "wallet".into(),
        account_id: "alice".into(),
        grant_id: "grant-1".into(),
        scope: ScopeSet::parse(scope),
        jkt: None,
        x5t_s256: None,
        aud: None,
        claims: None,
        expires_at: None,
    }
}

fn holder_key() -> SigningKey {
    SigningKey::from_slice(&[7u8; 32]).unwrap()
}

/// A P-256 key the holder does not control.
fn stranger_key() -> SigningKey {
    SigningKey::from_slice(&[11u8; 32]).unwrap()
}

/// The holder's public P-256 key.
pub fn holder_jwk() -> Value {
    let point = holder_key().verifying_key().to_encoded_point(false);
    json!({
        "kty": "EC",
        "crv": "P-256",
        "x": Base64UrlUnpadded::encode_string(point.x().unwrap().as_slice()),
        "y": Base64UrlUnpadded::encode_string(point.y().unwrap().as_slice()),
    })
}

pub fn holder_thumbprint() -> String {
    jwk_thumbprint(holder_jwk().as_object().unwrap()).unwrap()
}

/// `did:jwk` of the holder key; the subject of issued credentials.
pub fn holder_did() -> String {
    format!(
        "did:jwk:{}",
        Base64UrlUnpadded::encode_string(holder_jwk().to_string().as_bytes())
    )
}

/// Compact JWS over `header` and `claims`, signed ES256 by the holder.
pub fn compact_jwt(header: &Value, claims: &Value) -> String {
    sign_with(&holder_key(), header, claims)
}

/// The same JWS signed by a key the holder does not control.
pub fn compact_jwt_by_stranger(header: &Value, claims: &Value) -> String {
    sign_with(&stranger_key(), header, claims)
}

fn sign_with(key: &SigningKey, header: &Value, claims: &Value) -> String {
    let input = format!(
        "{}.{}",
        Base64UrlUnpadded::encode_string(header.to_string().as_bytes()),
        Base64UrlUnpadded::encode_string(claims.to_string().as_bytes()),
    );
    let signature: Signature = key.sign(input.as_bytes());
    format!("{input}.{}", Base64UrlUnpadded::encode_string(&signature.to_bytes()))
}

/// Replace the signature segment of a compact JWS.
pub fn forge_signature(jwt: &str) -> String {
    let (input, _) = jwt.rsplit_once('.').unwrap();
    format!("{input}.{}", Base64UrlUnpadded::encode_string(&[0x5a; 64]))
}

fn dpop_claims(access_token: &str, jti: &str) -> Value {
    json!({
        "jti": jti,
        "htm": "POST",
        "htu": CREDENTIAL_URL,
        "iat": chrono::Utc::now().timestamp(),
        "ath": sha256_b64url(access_token.as_bytes()),
    })
}

/// A DPoP proof for `POST /credential` bound to `access_token`.
pub fn dpop_proof(access_token: &str, jti: &str) -> String {
    compact_jwt(
        &json!({"typ": "dpop+jwt", "alg": "ES256", "jwk": holder_jwk()}),
        &dpop_claims(access_token, jti),
    )
}

/// A DPoP proof that names the holder key but is signed by another key.
pub fn dpop_proof_by_stranger(access_token: &str, jti: &str) -> String {
    compact_jwt_by_stranger(
        &json!({"typ": "dpop+jwt", "alg": "ES256", "jwk": holder_jwk()}),
        &dpop_claims(access_token, jti),
    )
}

/// Key proof JWT addressed to `aud`, with the holder key as a `did:jwk` kid.
pub fn key_proof_jwt(aud: &str) -> String {
    compact_jwt(
        &json!({
            "typ": "openid4vci-proof+jwt",
            "alg": "ES256",
            "kid": format!("{}#0", holder_did()),
        }),
        &json!({"aud": aud, "iat": chrono::Utc::now().timestamp(), "nonce": "c-nonce-1"}),
    )
}

/// An OpenID4VCI `jwt` key proof addressed to this issuer.
pub fn key_proof() -> Value {
    json!({"proof_type": "jwt", "jwt": key_proof_jwt(ISSUER)})
}

/// A request body for the UniversityDegree credential.
pub fn degree_body() -> Value {
    json!({
        "format": "jwt_vc_json",
        "credential_definition": {
            "@context": [W3C_V1, EXAMPLES_V1],
            "type": ["VerifiableCredential", "UniversityDegreeCredential"],
            "credentialSubject": {"given_name": {}, "family_name": {}, "degree": {}},
            "proof": key_proof()
        }
    })
}

/// Builder for `POST /credential`.
pub struct CredentialRequest {
    authorization: Option<String>,
    dpop: Vec<String>,
    client_cert: Option<Vec<u8>>,
    body: Value,
}

impl CredentialRequest {
    pub fn bearer(token: &str) -> Self {
        Self {
            authorization: Some(format!("Bearer {token}")),
            dpop: Vec::new(),
            client_cert: None,
            body: degree_body(),
        }
    }

    pub fn dpop(token: &str, jti: &str) -> Self {
        Self::dpop_with_proof(token, dpop_proof(token, jti))
    }

    pub fn dpop_with_proof(token: &str, proof: String) -> Self {
        Self {
            authorization: Some(format!("DPoP {token}")),
            dpop: vec![proof],
            client_cert: None,
            body: degree_body(),
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn client_cert(mut self, der: &[u8]) -> Self {
        self.client_cert = Some(der.to_vec());
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/credential")
            .header("content-type", "application/json");
        if let Some(authorization) = self.authorization {
            builder = builder.header("authorization", authorization);
        }
        for proof in self.dpop {
            builder = builder.header("dpop", proof);
        }
        if let Some(der) = self.client_cert {
            builder = builder.header("x-client-cert", Base64::encode_string(&der));
        }
        builder.body(Body::from(self.body.to_string())).unwrap()
    }
}
