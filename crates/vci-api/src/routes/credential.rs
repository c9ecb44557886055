//! # Credential Route
//!
//! `POST /credential`: translates the HTTP request into an
//! [`IncomingRequest`], runs the pipeline and renders its outcome.
//!
//! The client certificate arrives from the TLS terminator in a configurable
//! header as base64 DER; PEM armour around it is tolerated. The header is
//! read only when [`AppConfig::trust_client_cert_header`] is set.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64ct::{Base64, Encoding};
use vci_issuer::IncomingRequest;

use crate::error::{no_store_headers, AppError, RejectionResponse};
use crate::state::{AppConfig, AppState};

/// Header carrying DPoP proofs (RFC 9449 §4.1).
const DPOP: &str = "dpop";

pub fn router() -> Router<AppState> {
    Router::new().route("/credential", post(issue_credential))
}

async fn issue_credential(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match incoming_request(&state.config, &method, &uri, &headers, body) {
        Ok(request) => request,
        Err(e) => {
            state.metrics.record_outcome("invalid_request");
            return e.into_response();
        }
    };

    match state.endpoint.handle(request).await {
        Ok(credential) => {
            state.metrics.record_outcome("issued");
            (StatusCode::OK, no_store_headers(), Json(credential)).into_response()
        }
        Err(rejection) => {
            state.metrics.record_outcome(&rejection.error.code());
            RejectionResponse(rejection).into_response()
        }
    }
}

/// Build the transport view the pipeline consumes.
pub fn incoming_request(
    config: &AppConfig,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<IncomingRequest, AppError> {
    let header_text = |name: HeaderName| {
        headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    };

    let client_certificate = headers
        .get(config.client_cert_header.as_str())
        .filter(|_| config.trust_client_cert_header)
        .map(|v| decode_certificate(&String::from_utf8_lossy(v.as_bytes())))
        .transpose()?;

    Ok(IncomingRequest {
        method: method.as_str().to_string(),
        url: request_url(config, uri, header_text(HOST).as_deref()),
        authorization: header_text(AUTHORIZATION),
        dpop: headers
            .get_all(DPOP)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect(),
        client_certificate,
        content_type: header_text(CONTENT_TYPE),
        body: body.to_vec(),
    })
}

/// Absolute URL of the request as the client addressed it.
fn request_url(config: &AppConfig, uri: &Uri, host: Option<&str>) -> String {
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    match (&config.public_url, host) {
        (Some(base), _) => format!("{base}{path}"),
        (None, Some(host)) => format!("http://{host}{path}"),
        (None, None) => uri.to_string(),
    }
}

/// Decode a forwarded client certificate to DER.
fn decode_certificate(raw: &str) -> Result<Vec<u8>, AppError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let body = compact
        .replace("-----BEGINCERTIFICATE-----", "")
        .replace("-----ENDCERTIFICATE-----", "");
    if body.is_empty() {
        return Err(AppError::BadRequest("client certificate header is empty".into()));
    }
    Base64::decode_vec(&body)
        .map_err(|_| AppError::BadRequest("client certificate header is not base64 DER".into()))
}
