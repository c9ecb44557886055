//! Audience and requested-scope guards.

use vci_core::CredentialError;

use crate::context::RequestContext;

/// Reject tokens carrying an audience restriction.
///
/// Any `aud` fails, whatever its value. The description is always
/// "token audience prevents accessing this endpoint".
pub fn check_audience(ctx: &RequestContext) -> Result<(), CredentialError> {
    if ctx.access_token()?.aud.is_some() {
        return Err(CredentialError::invalid_token(
            "token audience prevents accessing this endpoint",
        ));
    }
    Ok(())
}

/// Reject an explicit `scope` parameter asking for more than the token holds.
///
/// Missing values are reported in request order, repeats included.
pub fn check_requested_scope(ctx: &RequestContext) -> Result<(), CredentialError> {
    let Some(requested) = ctx.params.scope.as_deref() else {
        return Ok(());
    };
    let token = ctx.access_token()?;
    let missing: Vec<&str> = requested
        .split(' ')
        .filter(|s| !s.is_empty() && !token.scope.contains(s))
        .collect();
    if !missing.is_empty() {
        return Err(CredentialError::insufficient_scope(
            "access token missing requested scope",
            missing.join(" "),
        ));
    }
    Ok(())
}
