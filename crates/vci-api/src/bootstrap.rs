//! # Bootstrap
//!
//! Builds the [`AppState`] from an [`AppConfig`]:
//!
//! 1. **Issuer config**: YAML from `VCI_CONFIG`, or the built-in default
//!    (no supported credentials, so every request fails closed).
//! 2. **Fixtures**: YAML seed for the in-memory stores from `VCI_FIXTURES`.
//! 3. **Provider**: the reference provider over those stores.
//! 4. **Metrics**: a fresh Prometheus registry.

use std::path::Path;
use std::sync::Arc;

use vci_issuer::{
    ConfigError, CredentialEndpoint, Fixtures, IssuerConfig, MemoryStore, ReferenceProvider,
};

use crate::middleware::metrics::ApiMetrics;
use crate::state::{AppConfig, AppState};

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The issuer configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The fixture file could not be read.
    #[error("failed to read fixtures {path}: {source}")]
    FixturesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The fixture file is not valid fixture YAML.
    #[error("failed to parse fixtures {path}: {source}")]
    FixturesParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The metrics registry could not be built.
    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Load configuration and fixtures and assemble the application state.
pub fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let issuer = match &config.issuer_config {
        Some(path) => IssuerConfig::from_file(path)?,
        None => {
            tracing::warn!("VCI_CONFIG not set; no credentials are supported");
            IssuerConfig::default()
        }
    };

    let fixtures = match &config.fixtures {
        Some(path) => load_fixtures(path)?,
        None => Fixtures::default(),
    };
    let store = MemoryStore::from_fixtures(fixtures);

    log_banner(&issuer, &store);

    let provider = ReferenceProvider::new(&issuer, store);
    let endpoint = CredentialEndpoint::new(provider, Arc::new(issuer));
    let metrics = ApiMetrics::new()?;
    Ok(AppState::new(config, endpoint, metrics))
}

fn load_fixtures(path: &Path) -> Result<Fixtures, BootstrapError> {
    let yaml = std::fs::read_to_string(path).map_err(|source| BootstrapError::FixturesIo {
        path: path.display().to_string(),
        source,
    })?;
    Fixtures::from_yaml_str(&yaml).map_err(|source| BootstrapError::FixturesParse {
        path: path.display().to_string(),
        source,
    })
}

fn log_banner(issuer: &IssuerConfig, store: &MemoryStore) {
    let (tokens, clients, accounts, grants) = store.counts();
    tracing::info!(
        issuer = %issuer.issuer,
        credentials = ?issuer.supported_credential_ids(),
        dpop_algs = ?issuer.dpop_signing_alg_values,
        tokens,
        clients,
        accounts,
        grants,
        "credential endpoint configured"
    );
}
