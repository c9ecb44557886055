//! # Issuance Orchestrator
//!
//! Last stage: verify the key proof, compute the released claims and hand
//! off to the credential issuer.

use tracing::debug;
use vci_core::{filter_claims, ClaimsClass, CredentialError};

use crate::claims::ClaimsMask;
use crate::config::IssuerConfig;
use crate::context::RequestContext;
use crate::provider::Provider;

/// Verify the key proof, mask claims and mint the credential.
pub async fn respond<P: Provider>(
    provider: &P,
    config: &IssuerConfig,
    ctx: &RequestContext,
) -> Result<serde_json::Value, CredentialError> {
    let verification = provider.verify_key_proof(ctx).await?;
    if !verification.verified {
        return Err(CredentialError::invalid_request(
            "Credential Request contains an invalid proof",
        ));
    }

    let token = ctx.access_token()?;
    let grant = ctx.grant()?;
    let account = ctx.account()?;

    let claims = filter_claims(token.claims.as_ref(), ClaimsClass::Userinfo, grant);
    let rejected = grant.rejected_oidc_claims();
    let requested = match ctx.params.scope.as_deref() {
        Some(scope) => vci_core::ScopeSet::parse(scope),
        None => token.scope.clone(),
    };
    let scope = grant.oidc_scope_filtered(&requested);

    let available = provider
        .account_claims(account, ClaimsClass::Userinfo, &scope, &claims, &rejected)
        .await?;

    let mut mask = ClaimsMask::new(available, &config.claims)?;
    mask.scope(&scope).mask(&claims).rejected(&rejected);
    let userinfo = mask.result();
    debug!(scope = %scope, released = userinfo.len(), "claims masked");

    Ok(provider
        .issue_credential(ctx, &verification, userinfo)
        .await?)
}
