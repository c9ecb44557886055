#![deny(missing_docs)]

//! # vci-core — Foundational Types for the Credential Endpoint
//!
//! Data model and error hierarchy shared by the issuance pipeline and the
//! HTTP surface. No I/O and no async: everything here is plain data with the
//! small amount of logic that belongs to the data itself (expiry checks,
//! grant filtering, lenient reading of wire input).
//!
//! ## Contents
//!
//! - [`AccessToken`], [`Audience`]: the presented bearer credential.
//! - [`DpopProof`]: the validated proof-of-possession artifact.
//! - [`Client`], [`Account`], [`Grant`]: identity and consent records.
//! - [`SupportedCredentialConfig`], [`CredentialDefinition`]: what the issuer
//!   can mint and what the caller asked for.
//! - [`ClaimsRequest`], [`filter_claims`]: the OIDC claims parameter.
//! - [`CredentialError`]: OAuth errors with wire codes and default statuses.

pub mod claims;
pub mod credential;
pub mod error;
pub mod grant;
pub mod identity;
pub mod proof;
pub mod scope;
pub mod token;

pub use claims::{filter_claims, ClaimsClass, ClaimsRequest};
pub use credential::{CredentialDefinition, SupportedCredentialConfig};
pub use error::{CredentialError, NO_ACCESS_TOKEN};
pub use grant::{Grant, GrantRejections, OidcGrant};
pub use identity::{Account, Client};
pub use proof::DpopProof;
pub use scope::ScopeSet;
pub use token::{AccessToken, Audience};
