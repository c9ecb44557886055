//! # Token Resolver & Binding Validator
//!
//! Extracts the presented access token, validates any DPoP proof, loads the
//! token and enforces, in order:
//!
//! 1. the `openid` scope is granted;
//! 2. at least one configured credential identifier is granted;
//! 3. certificate binding (`x5t#S256`) matches the presented certificate;
//! 4. the DPoP proof's `jti` has not been seen for this client;
//! 5. key binding (`jkt`) matches the DPoP proof's key.
//!
//! The token is stored on the context as soon as it is found, so a later
//! failure in this stage still drives the DPoP challenge for bound tokens.

use chrono::Duration;
use subtle::ConstantTimeEq;
use tracing::debug;
use vci_core::{CredentialError, NO_ACCESS_TOKEN};

use crate::config::IssuerConfig;
use crate::context::{IncomingRequest, RequestContext};
use crate::provider::Provider;

/// Lifetime of a replay-detection entry, counted from acceptance.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// How the token was presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: DPoP <token>` with a `DPoP` proof header.
    Dpop,
}

/// Pull the access token out of the `Authorization` header.
pub fn extract_access_token(
    request: &IncomingRequest,
) -> Result<(TokenScheme, &str), CredentialError> {
    let header = request
        .authorization
        .as_deref()
        .ok_or_else(|| CredentialError::invalid_request(NO_ACCESS_TOKEN))?;

    let mut parts = header.split(' ');
    let (Some(scheme), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CredentialError::invalid_request(
            "invalid authorization header value format",
        ));
    };
    if value.is_empty() {
        return Err(CredentialError::invalid_request(
            "invalid authorization header value format",
        ));
    }

    let has_proof = !request.dpop.is_empty();
    let scheme = if scheme.eq_ignore_ascii_case("dpop") {
        if !has_proof {
            return Err(CredentialError::invalid_request("`DPoP` header not provided"));
        }
        TokenScheme::Dpop
    } else if has_proof {
        return Err(CredentialError::invalid_request(
            "authorization header scheme must be `DPoP` when DPoP is used",
        ));
    } else if scheme.eq_ignore_ascii_case("bearer") {
        TokenScheme::Bearer
    } else {
        return Err(CredentialError::invalid_request(
            "authorization header scheme must be `Bearer`",
        ));
    };

    if request.dpop.len() > 1 {
        return Err(CredentialError::invalid_dpop_proof(
            "multiple DPoP headers provided",
        ));
    }

    Ok((scheme, value))
}

/// Resolve the access token and validate its scope and bindings.
pub async fn resolve_access_token<P: Provider>(
    provider: &P,
    config: &IssuerConfig,
    ctx: &mut RequestContext,
) -> Result<(), CredentialError> {
    let (scheme, value) = extract_access_token(&ctx.request)?;
    let value = value.to_owned();

    let dpop = match scheme {
        TokenScheme::Dpop => provider.validate_dpop(ctx, &value).await?,
        TokenScheme::Bearer => None,
    };

    let token = provider
        .find_token(&value)
        .await?
        .ok_or_else(|| CredentialError::invalid_token("access token not found"))?;
    debug!(client_id = %token.client_id, grant_id = %token.grant_id, "access token resolved");

    ctx.dpop = dpop;
    ctx.access_token = Some(token);
    let ctx = &*ctx;
    let token = ctx.access_token()?;

    if token.scope.is_empty() || !token.scope.contains("openid") {
        return Err(CredentialError::insufficient_scope(
            "access token missing openid scope",
            "openid",
        ));
    }

    let supported_ids = config.supported_credential_ids();
    if !supported_ids.iter().any(|id| token.scope.contains(id)) {
        return Err(CredentialError::insufficient_scope(
            "access token missing a supported credential in scope.",
            format!("any of [{}]", supported_ids.join(", ")),
        ));
    }

    if let Some(expected) = &token.x5t_s256 {
        let bound = ctx
            .request
            .client_certificate
            .as_deref()
            .map(|cert| provider.certificate_thumbprint(cert))
            .is_some_and(|actual| constant_time_eq(expected, &actual));
        if !bound {
            return Err(CredentialError::invalid_token("failed x5t#S256 verification"));
        }
    }

    if let Some(proof) = &ctx.dpop {
        let expires_at = ctx.now + Duration::seconds(REPLAY_WINDOW_SECS);
        let unique = provider
            .unique(ctx, &token.client_id, &proof.jti, expires_at)
            .await?;
        if !unique {
            return Err(CredentialError::invalid_token("DPoP proof JWT Replay detected"));
        }
    }

    if let Some(jkt) = &token.jkt {
        let bound = ctx
            .dpop
            .as_ref()
            .is_some_and(|proof| constant_time_eq(jkt, &proof.thumbprint));
        if !bound {
            return Err(CredentialError::invalid_token("failed jkt verification"));
        }
    }

    Ok(())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
