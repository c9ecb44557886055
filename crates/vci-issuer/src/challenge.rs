//! # Challenge Emitter
//!
//! Turns a pipeline failure into a [`Rejection`]: the original error, the
//! final HTTP status and, for exposed errors, the `WWW-Authenticate`
//! challenge (RFC 6750 §3, RFC 9449 §7.1).
//!
//! The scheme is `DPoP` when the error description mentions DPoP or when the
//! resolved token is key-bound, `Bearer` otherwise. Proof-of-possession
//! failures always answer 401.

use std::fmt;

use vci_core::{AccessToken, CredentialError, NO_ACCESS_TOKEN};

use crate::config::IssuerConfig;

/// Authentication scheme advertised in the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Dpop,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "Bearer",
            Self::Dpop => "DPoP",
        }
    }
}

/// A structured `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: AuthScheme,
    pub realm: String,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub scope: Option<String>,
    /// Space-separated acceptable DPoP algorithms; `DPoP` scheme only.
    pub algs: Option<String>,
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} realm=\"{}\"", self.scheme.as_str(), escape(&self.realm))?;
        let params = [
            ("error", &self.error),
            ("error_description", &self.error_description),
            ("scope", &self.scope),
            ("algs", &self.algs),
        ];
        for (name, value) in params {
            if let Some(value) = value {
                write!(f, ", {name}=\"{}\"", escape(value))?;
            }
        }
        Ok(())
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A failed credential request, ready for the transport layer.
#[derive(Debug)]
pub struct Rejection {
    pub error: CredentialError,
    pub status: u16,
    /// Present for every exposed error.
    pub challenge: Option<Challenge>,
}

impl Rejection {
    /// Nonce for the `DPoP-Nonce` response header.
    pub fn dpop_nonce(&self) -> Option<&str> {
        self.error.dpop_nonce()
    }
}

/// Choose the challenge scheme for `error`.
pub fn scheme_for(error: &CredentialError, token: Option<&AccessToken>) -> AuthScheme {
    let mentions_dpop = error.description().to_ascii_lowercase().contains("dpop");
    if mentions_dpop || token.is_some_and(AccessToken::is_dpop_bound) {
        AuthScheme::Dpop
    } else {
        AuthScheme::Bearer
    }
}

/// Build the rejection for a pipeline failure.
pub fn reject(
    error: CredentialError,
    token: Option<&AccessToken>,
    config: &IssuerConfig,
) -> Rejection {
    if !error.is_exposed() {
        return Rejection {
            status: error.default_status(),
            error,
            challenge: None,
        };
    }

    let status = if error.is_dpop_failure() {
        401
    } else {
        error.default_status()
    };

    let scheme = scheme_for(&error, token);
    let detailed = error.description() != NO_ACCESS_TOKEN;
    let challenge = Challenge {
        scheme,
        realm: config.issuer.clone(),
        error: detailed.then(|| error.code()),
        error_description: detailed.then(|| error.description().to_string()),
        scope: error.scope().filter(|_| detailed).map(str::to_owned),
        algs: (scheme == AuthScheme::Dpop).then(|| config.dpop_signing_alg_values.join(" ")),
    };

    Rejection {
        error,
        status,
        challenge: Some(challenge),
    }
}
