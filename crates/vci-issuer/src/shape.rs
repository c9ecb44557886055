//! # Credential Shape Validator
//!
//! Negotiates the requested credential against the supported
//! configurations. Each axis is an independent existential check: some
//! configuration must accept the `@context`, some configuration must accept
//! the `type`, and some configuration must accept the `credentialSubject`,
//! but they need not be the same configuration.
//!
//! - `@context` and `type` are subset checks: every required value of the
//!   configuration appears in the request, which may list more.
//! - `credentialSubject` is exact, order-insensitive structural equality.

use serde_json::{Map, Value};
use tracing::debug;
use vci_core::{CredentialDefinition, CredentialError, SupportedCredentialConfig};

use crate::context::RequestContext;

/// Whether some configuration uses `format`.
pub fn is_format_supported(format: &str, supported: &[SupportedCredentialConfig]) -> bool {
    supported.iter().any(|c| c.format == format)
}

/// Whether some configuration's required `@context` values all appear in
/// `context`. An empty request list never matches.
pub fn is_context_supported(context: &[String], supported: &[SupportedCredentialConfig]) -> bool {
    !context.is_empty() && supported.iter().any(|c| is_subset(&c.context, context))
}

/// Whether some configuration's required `types` all appear in `types`. An
/// empty request list never matches.
pub fn is_type_supported(types: &[String], supported: &[SupportedCredentialConfig]) -> bool {
    !types.is_empty() && supported.iter().any(|c| is_subset(&c.types, types))
}

/// Whether some configuration's `credentialSubject` equals `subject` exactly.
pub fn is_credential_subject_supported(
    subject: &Map<String, Value>,
    supported: &[SupportedCredentialConfig],
) -> bool {
    supported.iter().any(|c| &c.credential_subject == subject)
}

fn is_subset(required: &[String], offered: &[String]) -> bool {
    required.iter().all(|r| offered.contains(r))
}

/// Validate `format` and `credential_definition` and store the parsed
/// definition on the context.
pub fn validate_credential_request(
    ctx: &mut RequestContext,
    supported: &[SupportedCredentialConfig],
) -> Result<(), CredentialError> {
    let format_ok = ctx
        .params
        .format
        .as_deref()
        .is_some_and(|f| is_format_supported(f, supported));
    if !format_ok {
        return Err(CredentialError::invalid_request(
            "Credential Request did not contain a format or it is unsupported",
        ));
    }

    let Some(raw) = &ctx.params.credential_definition else {
        return Err(CredentialError::invalid_request(
            "Credential Request did not contain a credential_definition",
        ));
    };
    let definition = CredentialDefinition::from_value(raw);

    if !definition
        .context
        .as_deref()
        .is_some_and(|c| is_context_supported(c, supported))
    {
        return Err(unsupported("@context"));
    }
    if !definition
        .types
        .as_deref()
        .is_some_and(|t| is_type_supported(t, supported))
    {
        return Err(unsupported("type"));
    }
    if !definition
        .credential_subject
        .as_ref()
        .is_some_and(|s| is_credential_subject_supported(s, supported))
    {
        return Err(unsupported("credentialSubject"));
    }
    if definition.proof.is_none() {
        return Err(CredentialError::invalid_request(
            "Credential Request did not contain a proof",
        ));
    }

    debug!(format = ?ctx.params.format, "credential definition accepted");
    ctx.credential_definition = Some(definition);
    Ok(())
}

fn unsupported(field: &str) -> CredentialError {
    CredentialError::invalid_request(format!(
        "Credential Request did not contain a credential_definition['{field}'] or it is unsupported"
    ))
}
