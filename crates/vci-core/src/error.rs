//! # Error Hierarchy
//!
//! OAuth 2.0 / OpenID errors raised by the credential endpoint, built with
//! `thiserror`. The `Display` of each variant is the wire error code
//! (`invalid_token`, `insufficient_scope`, ...); the description travels
//! separately so the challenge emitter and the JSON error body can surface
//! both.
//!
//! Every variant except [`CredentialError::Internal`] is *exposed*: its code and
//! description are safe to return to the caller and drive the
//! `WWW-Authenticate` challenge. Internal failures stay opaque.

use thiserror::Error;

/// Description used when the request carries no access token at all.
///
/// The challenge for this case carries only the realm (RFC 6750 §3.1).
pub const NO_ACCESS_TOKEN: &str = "no access token provided";

/// Errors produced by the credential endpoint pipeline.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The request is malformed or asks for an unsupported credential shape.
    #[error("invalid_request")]
    InvalidRequest {
        /// Human-readable detail.
        description: String,
    },

    /// The access token is missing, unknown, or fails a binding or
    /// consistency check.
    #[error("invalid_token")]
    InvalidToken {
        /// Human-readable detail.
        description: String,
    },

    /// The access token lacks a scope the request requires.
    #[error("insufficient_scope")]
    InsufficientScope {
        /// Human-readable detail.
        description: String,
        /// The scope that would have been sufficient, reported in the challenge.
        scope: String,
    },

    /// The DPoP proof is malformed or does not match the request.
    #[error("invalid_dpop_proof")]
    InvalidDpopProof {
        /// Human-readable detail.
        description: String,
    },

    /// The DPoP proof must carry a server-provided nonce.
    #[error("use_dpop_nonce")]
    UseDpopNonce {
        /// Human-readable detail.
        description: String,
        /// Fresh nonce to hand back in the `DPoP-Nonce` response header.
        nonce: Option<String>,
    },

    /// A collaborator failed unexpectedly. Never exposed to the caller.
    #[error("server_error")]
    Internal(#[from] anyhow::Error),
}

impl CredentialError {
    /// Construct an `invalid_request` error.
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest {
            description: description.into(),
        }
    }

    /// Construct an `invalid_token` error.
    pub fn invalid_token(description: impl Into<String>) -> Self {
        Self::InvalidToken {
            description: description.into(),
        }
    }

    /// Construct an `insufficient_scope` error naming the sufficient scope.
    pub fn insufficient_scope(description: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::InsufficientScope {
            description: description.into(),
            scope: scope.into(),
        }
    }

    /// Construct an `invalid_dpop_proof` error.
    pub fn invalid_dpop_proof(description: impl Into<String>) -> Self {
        Self::InvalidDpopProof {
            description: description.into(),
        }
    }

    /// Construct a `use_dpop_nonce` error.
    pub fn use_dpop_nonce(description: impl Into<String>, nonce: Option<String>) -> Self {
        Self::UseDpopNonce {
            description: description.into(),
            nonce,
        }
    }

    /// The wire error code (`error` member of the response body).
    pub fn code(&self) -> String {
        self.to_string()
    }

    /// The human-readable description (`error_description`).
    ///
    /// Internal errors return a generic message; their cause is logged, not
    /// surfaced.
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest { description }
            | Self::InvalidToken { description }
            | Self::InsufficientScope { description, .. }
            | Self::InvalidDpopProof { description }
            | Self::UseDpopNonce { description, .. } => description,
            Self::Internal(_) => "oops! something went wrong",
        }
    }

    /// The scope reported in the challenge, for `insufficient_scope`.
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::InsufficientScope { scope, .. } => Some(scope),
            _ => None,
        }
    }

    /// The nonce to return in `DPoP-Nonce`, for `use_dpop_nonce`.
    pub fn dpop_nonce(&self) -> Option<&str> {
        match self {
            Self::UseDpopNonce { nonce, .. } => nonce.as_deref(),
            _ => None,
        }
    }

    /// Whether the code and description may be returned to the caller.
    pub fn is_exposed(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Whether this is a proof-of-possession failure whose status is forced
    /// to 401 by the challenge emitter.
    pub fn is_dpop_failure(&self) -> bool {
        matches!(self, Self::InvalidDpopProof { .. } | Self::UseDpopNonce { .. })
    }

    /// The default HTTP status for this error, before the challenge emitter
    /// applies any override.
    pub fn default_status(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::InvalidToken { .. } => 401,
            Self::InsufficientScope { .. } => 403,
            Self::InvalidDpopProof { .. } | Self::UseDpopNonce { .. } => 400,
            Self::Internal(_) => 500,
        }
    }
}
