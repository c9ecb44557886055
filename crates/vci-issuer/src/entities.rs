//! # Entity Loader
//!
//! Resolves the client, account and grant the access token refers to and
//! cross-checks the grant against the token. Each lookup is its own await
//! point; nothing is fetched concurrently because each check depends on the
//! token already being resolved.

use tracing::debug;
use vci_core::CredentialError;

use crate::context::RequestContext;
use crate::provider::{AccountResolver, ClientStore, GrantStore};

/// Load the client the token was issued to.
pub async fn load_client<P: ClientStore>(
    provider: &P,
    ctx: &mut RequestContext,
) -> Result<(), CredentialError> {
    let client_id = &ctx.access_token()?.client_id;
    let client = provider
        .find_client(client_id)
        .await?
        .ok_or_else(|| CredentialError::invalid_token("associated client not found"))?;
    ctx.client = Some(client);
    Ok(())
}

/// Load the account the token acts for.
pub async fn load_account<P: AccountResolver>(
    provider: &P,
    ctx: &mut RequestContext,
) -> Result<(), CredentialError> {
    let token = ctx.access_token()?;
    let account = provider
        .find_account(ctx, &token.account_id, token)
        .await?
        .ok_or_else(|| CredentialError::invalid_token("associated account not found"))?;
    ctx.account = Some(account);
    Ok(())
}

/// Load the grant and check it still covers the token.
pub async fn load_grant<P: GrantStore>(
    provider: &P,
    ctx: &mut RequestContext,
) -> Result<(), CredentialError> {
    let token = ctx.access_token()?;
    let grant = provider
        .find_grant(&token.grant_id, true)
        .await?
        .ok_or_else(|| CredentialError::invalid_token("grant not found"))?;

    if grant.is_expired_at(ctx.now) {
        return Err(CredentialError::invalid_token("grant is expired"));
    }
    if grant.client_id != token.client_id {
        return Err(CredentialError::invalid_token("clientId mismatch"));
    }
    if grant.account_id != token.account_id {
        return Err(CredentialError::invalid_token("accountId mismatch"));
    }

    debug!(grant_id = %grant.grant_id, "grant loaded");
    ctx.grant = Some(grant);
    Ok(())
}
