//! # vci-issuer — Credential Endpoint Pipeline
//!
//! Validates an OpenID4VCI credential request and produces the issuance
//! response, or a [`Rejection`] carrying the OAuth error, HTTP status and
//! `WWW-Authenticate` challenge.
//!
//! ## Stages
//!
//! | Stage | Module |
//! |-------|--------|
//! | Request normalizer | [`params`] |
//! | Token resolver & binding validator | [`token`] |
//! | Audience guard, requested-scope check | [`guards`] |
//! | Credential shape validator | [`shape`] |
//! | Entity loader | [`entities`] |
//! | Claims mask, issuance orchestrator | [`claims`], [`issue`] |
//! | Challenge emitter | [`challenge`] |
//!
//! [`CredentialEndpoint`] runs them in order. Everything the pipeline needs
//! from its host (token and entity storage, replay detection, DPoP and key
//! proof validation, credential minting) sits behind the traits in
//! [`provider`].
//!
//! ## Hosting
//!
//! [`ReferenceProvider`] wires the in-memory [`MemoryStore`] and
//! [`ReplayCache`] with the JWS proof checks in [`reference`]; it is
//! what the HTTP service uses when no other provider is configured.

pub mod challenge;
pub mod claims;
pub mod config;
pub mod context;
pub mod entities;
pub mod guards;
pub mod issue;
pub mod jws;
pub mod memory;
pub mod params;
pub mod pipeline;
pub mod provider;
pub mod reference;
pub mod shape;
pub mod thumbprint;
pub mod token;

#[cfg(test)]
mod testing;

pub use challenge::{AuthScheme, Challenge, Rejection};
pub use config::{ConfigError, IssuerConfig};
pub use context::{IncomingRequest, RequestContext};
pub use memory::{Fixtures, MemoryStore, ReplayCache};
pub use pipeline::CredentialEndpoint;
pub use provider::Provider;
pub use reference::ReferenceProvider;
