//! # API Error Types
//!
//! Every error leaves the service as an OAuth error body,
//! `{"error": code, "error_description": description}`. Pipeline rejections
//! additionally carry `WWW-Authenticate` and, when issued, `DPoP-Nonce`.
//! Internal details are logged, never returned.

use axum::http::header::{CACHE_CONTROL, PRAGMA, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vci_issuer::Rejection;

/// `DPoP-Nonce` response header (RFC 9449 §8).
pub const DPOP_NONCE: &str = "dpop-nonce";

/// OAuth error response body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: String,
}

/// Errors raised by the HTTP layer itself, outside the pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request could not be turned into a pipeline request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal failure (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "invalid_request".into(),
                    error_description: msg.clone(),
                },
            ),
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "server_error".into(),
                        error_description: "oops! something went wrong".into(),
                    },
                )
            }
        };
        (status, no_store_headers(), Json(body)).into_response()
    }
}

/// HTTP rendering of a pipeline [`Rejection`].
#[derive(Debug)]
pub struct RejectionResponse(pub Rejection);

impl IntoResponse for RejectionResponse {
    fn into_response(self) -> Response {
        let rejection = self.0;
        let status =
            StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut headers = no_store_headers();
        if let Some(challenge) = &rejection.challenge {
            match HeaderValue::from_str(&challenge.to_string()) {
                Ok(value) => {
                    headers.insert(WWW_AUTHENTICATE, value);
                }
                Err(e) => tracing::warn!(error = %e, "challenge is not a valid header value"),
            }
        }
        if let Some(nonce) = rejection.dpop_nonce() {
            if let Ok(value) = HeaderValue::from_str(nonce) {
                headers.insert(HeaderName::from_static(DPOP_NONCE), value);
            }
        }

        let body = ErrorBody {
            error: rejection.error.code(),
            error_description: rejection.error.description().to_string(),
        };
        (status, headers, Json(body)).into_response()
    }
}

/// `Cache-Control: no-store` and `Pragma: no-cache`.
pub fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}
