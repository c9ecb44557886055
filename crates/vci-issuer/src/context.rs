//! # Request Context
//!
//! One [`RequestContext`] per credential request. It owns the transport view
//! of the request and every entity the pipeline resolves along the way; each
//! stage fills in its own slot and later stages read it back through the
//! fallible accessors.
//!
//! A missing slot when a later stage asks for it means stages ran out of
//! order. That is an internal failure, never a client error.

use std::fmt;

use chrono::{DateTime, Utc};
use vci_core::{
    AccessToken, Account, Client, CredentialDefinition, CredentialError, DpopProof, Grant,
};

use crate::params::CredentialParams;

/// The transport-level view of a credential request.
#[derive(Clone, Default)]
pub struct IncomingRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Absolute request URL as seen by the client.
    pub url: String,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
    /// Every `DPoP` header value, in order of appearance.
    pub dpop: Vec<String>,
    /// DER-encoded mTLS client certificate, if one was presented.
    pub client_certificate: Option<Vec<u8>>,
    /// Raw `Content-Type` header.
    pub content_type: Option<String>,
    /// Request body.
    pub body: Vec<u8>,
}

// Custom Debug to keep credentials out of logs.
impl fmt::Debug for IncomingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .field("dpop", &self.dpop.len())
            .field("client_certificate", &self.client_certificate.is_some())
            .field("content_type", &self.content_type)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Per-request state accumulated by the pipeline stages.
#[derive(Debug)]
pub struct RequestContext {
    /// The request being processed.
    pub request: IncomingRequest,
    /// Clock reading taken when processing started.
    pub now: DateTime<Utc>,
    /// Recognized body parameters.
    pub params: CredentialParams,
    /// Resolved access token.
    pub access_token: Option<AccessToken>,
    /// Validated DPoP proof, when one was presented.
    pub dpop: Option<DpopProof>,
    /// Requested credential shape, once validated.
    pub credential_definition: Option<CredentialDefinition>,
    /// Client the token was issued to.
    pub client: Option<Client>,
    /// Account the token acts for.
    pub account: Option<Account>,
    /// Grant the token was minted under.
    pub grant: Option<Grant>,
}

impl RequestContext {
    pub fn new(request: IncomingRequest, now: DateTime<Utc>) -> Self {
        Self {
            request,
            now,
            params: CredentialParams::default(),
            access_token: None,
            dpop: None,
            credential_definition: None,
            client: None,
            account: None,
            grant: None,
        }
    }

    pub fn access_token(&self) -> Result<&AccessToken, CredentialError> {
        self.access_token.as_ref().ok_or_else(|| unresolved("access token"))
    }

    pub fn credential_definition(&self) -> Result<&CredentialDefinition, CredentialError> {
        self.credential_definition
            .as_ref()
            .ok_or_else(|| unresolved("credential definition"))
    }

    pub fn client(&self) -> Result<&Client, CredentialError> {
        self.client.as_ref().ok_or_else(|| unresolved("client"))
    }

    pub fn account(&self) -> Result<&Account, CredentialError> {
        self.account.as_ref().ok_or_else(|| unresolved("account"))
    }

    pub fn grant(&self) -> Result<&Grant, CredentialError> {
        self.grant.as_ref().ok_or_else(|| unresolved("grant"))
    }
}

fn unresolved(entity: &str) -> CredentialError {
    CredentialError::Internal(anyhow::anyhow!("{entity} not resolved before use"))
}
