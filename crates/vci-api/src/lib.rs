//! # vci-api — HTTP Surface for the Credential Endpoint
//!
//! ## Routes
//!
//! | Route | Module |
//! |-------|--------|
//! | `POST /credential` | [`routes::credential`] |
//! | `GET /health/liveness`, `GET /health/readiness` | [`routes::health`] |
//! | `GET /metrics` | Prometheus text exposition |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → DefaultBodyLimit (1 MiB) → Handler
//! ```

pub mod bootstrap;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Largest accepted credential request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Assemble the application router.
///
/// Health probes and `/metrics` sit outside the metrics middleware so
/// scrapes do not count themselves.
pub fn app(state: AppState) -> Router {
    let api = routes::credential::router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(state.metrics.clone()));

    let probes = routes::health::router().route("/metrics", get(prometheus_metrics));

    Router::new()
        .merge(probes)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /metrics: Prometheus scrape endpoint.
async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => AppError::Internal(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, WWW_AUTHENTICATE};
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use vci_core::{AccessToken, Account, Client, Grant, OidcGrant, ScopeSet};
    use vci_issuer::{CredentialEndpoint, IssuerConfig, MemoryStore, ReferenceProvider};

    use crate::middleware::metrics::ApiMetrics;
    use crate::state::AppConfig;

    fn issuer_config() -> IssuerConfig {
        IssuerConfig::from_yaml_str(
            r#"
issuer: https://issuer.example
credentials_supported:
  - id: UniversityDegree
    format: jwt_vc_json
    "@context": ["https://www.w3.org/2018/credentials/v1"]
    types: ["VerifiableCredential", "UniversityDegreeCredential"]
    credentialSubject:
      given_name: {}
"#,
        )
        .unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_token(AccessToken {
            value: "tok".into(),
            client_id: "wallet".into(),
            account_id: "alice".into(),
            grant_id: "grant-1".into(),
            scope: ScopeSet::parse("openid UniversityDegree"),
            jkt: None,
            x5t_s256: None,
            aud: None,
            claims: None,
            expires_at: None,
        });
        store.insert_client(Client {
            client_id: "wallet".into(),
            metadata: Default::default(),
        });
        store.insert_account(Account {
            account_id: "alice".into(),
            claims: Default::default(),
        });
        store.insert_grant(Grant {
            grant_id: "grant-1".into(),
            client_id: "wallet".into(),
            account_id: "alice".into(),
            expires_at: None,
            openid: Some(OidcGrant {
                scope: ScopeSet::parse("openid UniversityDegree"),
                claims: Default::default(),
            }),
            rejected: Default::default(),
        });
        store
    }

    fn test_state(issuer: IssuerConfig) -> AppState {
        let provider = ReferenceProvider::new(&issuer, seeded_store());
        AppState::new(
            AppConfig::default(),
            CredentialEndpoint::new(provider, std::sync::Arc::new(issuer)),
            ApiMetrics::new().unwrap(),
        )
    }

    fn test_app() -> Router {
        app(test_state(issuer_config()))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn credential_request(authorization: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/credential")
            .header("host", "issuer.example")
            .header(CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn liveness_is_ok() {
        let resp = test_app()
            .oneshot(Request::get("/health/liveness").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_requires_credentials() {
        let ready = test_app()
            .oneshot(Request::get("/health/readiness").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::OK);

        let unconfigured = app(test_state(IssuerConfig::default()))
            .oneshot(Request::get("/health/readiness").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(unconfigured.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn missing_token_gets_realm_only_challenge() {
        let resp = test_app()
            .oneshot(credential_request(None, json!({"format": "jwt_vc_json"})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[CACHE_CONTROL], "no-store");
        assert_eq!(
            resp.headers()[WWW_AUTHENTICATE],
            "Bearer realm=\"https://issuer.example\""
        );
        let body = json_body(resp).await;
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["error_description"], "no access token provided");
    }

    #[tokio::test]
    async fn missing_proof_is_rejected_after_binding_checks() {
        let body = json!({
            "format": "jwt_vc_json",
            "credential_definition": {
                "@context": ["https://www.w3.org/2018/credentials/v1"],
                "type": ["VerifiableCredential", "UniversityDegreeCredential"],
                "credentialSubject": {"given_name": {}}
            }
        });
        let resp = test_app()
            .oneshot(credential_request(Some("Bearer tok"), body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["error_description"], "Credential Request did not contain a proof");
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let resp = test_app()
            .oneshot(
                Request::post("/credential")
                    .header(AUTHORIZATION, "Bearer tok")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(vec![b' '; MAX_BODY_BYTES + 1]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn metrics_count_outcomes() {
        let state = test_state(issuer_config());
        let router = app(state.clone());
        router
            .clone()
            .oneshot(credential_request(Some("Bearer nope"), json!({})))
            .await
            .unwrap();

        assert_eq!(state.metrics.outcome("invalid_token"), 1);
        assert_eq!(state.metrics.requests(), 1);

        let resp = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = String::from_utf8(
            resp.into_body().collect().await.unwrap().to_bytes().to_vec(),
        )
        .unwrap();
        assert!(text.contains("vci_credential_outcomes_total{outcome=\"invalid_token\"} 1"));
    }
}
