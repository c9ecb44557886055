//! # Credential Endpoint
//!
//! Runs the stages strictly in order over one [`RequestContext`]:
//!
//! 1. request normalizer
//! 2. token resolver & binding validator
//! 3. audience guard
//! 4. requested-scope check
//! 5. credential shape validator
//! 6. entity loader (client, account, grant)
//! 7. issuance orchestrator
//!
//! The first failure stops the run and goes through the challenge emitter;
//! no failure is retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use vci_core::CredentialError;

use crate::challenge::{self, Rejection};
use crate::config::IssuerConfig;
use crate::context::{IncomingRequest, RequestContext};
use crate::provider::Provider;
use crate::{entities, guards, issue, params, shape, token};

/// The credential endpoint, generic over its host's collaborators.
#[derive(Debug, Clone)]
pub struct CredentialEndpoint<P> {
    provider: P,
    config: Arc<IssuerConfig>,
}

impl<P: Provider> CredentialEndpoint<P> {
    pub fn new(provider: P, config: Arc<IssuerConfig>) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Process one credential request.
    pub async fn handle(&self, request: IncomingRequest) -> Result<Value, Rejection> {
        self.handle_at(request, Utc::now()).await
    }

    /// Process one credential request against a fixed clock reading.
    #[instrument(level = "debug", skip_all, fields(method = %request.method))]
    pub async fn handle_at(
        &self,
        request: IncomingRequest,
        now: DateTime<Utc>,
    ) -> Result<Value, Rejection> {
        let mut ctx = RequestContext::new(request, now);
        match self.run(&mut ctx).await {
            Ok(body) => {
                debug!("credential issued");
                Ok(body)
            }
            Err(err) => {
                let rejection = challenge::reject(err, ctx.access_token.as_ref(), &self.config);
                if rejection.error.is_exposed() {
                    warn!(
                        error = %rejection.error,
                        error_description = rejection.error.description(),
                        status = rejection.status,
                        "credential request rejected"
                    );
                } else {
                    error!(error = ?rejection.error, "credential request failed");
                }
                Err(rejection)
            }
        }
    }

    async fn run(&self, ctx: &mut RequestContext) -> Result<Value, CredentialError> {
        ctx.params = params::normalize(&ctx.request)?;
        debug!("request normalized");

        token::resolve_access_token(&self.provider, &self.config, ctx).await?;
        guards::check_audience(ctx)?;
        guards::check_requested_scope(ctx)?;
        shape::validate_credential_request(ctx, &self.config.credentials_supported)?;

        entities::load_client(&self.provider, ctx).await?;
        entities::load_account(&self.provider, ctx).await?;
        entities::load_grant(&self.provider, ctx).await?;
        debug!("entities loaded");

        issue::respond(&self.provider, &self.config, ctx).await
    }
}
