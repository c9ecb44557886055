//! # Application State
//!
//! Process configuration read from the environment, and the shared state
//! handed to every handler.

use std::path::PathBuf;
use std::sync::Arc;

use vci_issuer::{CredentialEndpoint, ReferenceProvider};

use crate::middleware::metrics::ApiMetrics;

/// Default header carrying the client certificate forwarded by the TLS
/// terminator.
pub const DEFAULT_CLIENT_CERT_HEADER: &str = "x-client-cert";

/// Server configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Issuer configuration YAML. `None` runs with the built-in default.
    pub issuer_config: Option<PathBuf>,
    /// YAML seed file for the in-memory stores.
    pub fixtures: Option<PathBuf>,
    /// Header the TLS terminator forwards the client certificate in.
    pub client_cert_header: String,
    /// Read the client certificate from `client_cert_header`. Clients can
    /// set any header, so enable this only behind a proxy that terminates
    /// mTLS and strips or overwrites the header on every request. Off by
    /// default: certificate-bound tokens then fail binding.
    pub trust_client_cert_header: bool,
    /// Externally visible base URL, used to rebuild the request URL that
    /// DPoP proofs are bound to.
    pub public_url: Option<String>,
    /// Emit JSON log lines.
    pub json_logs: bool,
}

impl AppConfig {
    /// Read configuration from `PORT`, `VCI_CONFIG`, `VCI_FIXTURES`,
    /// `VCI_CLIENT_CERT_HEADER`, `VCI_TRUST_CLIENT_CERT_HEADER`,
    /// `VCI_PUBLIC_URL` and `VCI_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            issuer_config: var("VCI_CONFIG").map(PathBuf::from),
            fixtures: var("VCI_FIXTURES").map(PathBuf::from),
            client_cert_header: var("VCI_CLIENT_CERT_HEADER")
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or(defaults.client_cert_header),
            trust_client_cert_header: var("VCI_TRUST_CLIENT_CERT_HEADER")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            public_url: var("VCI_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()),
            json_logs: var("VCI_LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        }
    }
}

// Fixture and config paths can point at files with bearer tokens; log only
// whether they are set.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("issuer_config", &self.issuer_config.as_ref().map(|_| "[set]"))
            .field("fixtures", &self.fixtures.as_ref().map(|_| "[set]"))
            .field("client_cert_header", &self.client_cert_header)
            .field("trust_client_cert_header", &self.trust_client_cert_header)
            .field("public_url", &self.public_url)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            issuer_config: None,
            fixtures: None,
            client_cert_header: DEFAULT_CLIENT_CERT_HEADER.to_string(),
            trust_client_cert_header: false,
            public_url: None,
            json_logs: false,
        }
    }
}

/// Shared application state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub endpoint: Arc<CredentialEndpoint<ReferenceProvider>>,
    pub metrics: ApiMetrics,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        endpoint: CredentialEndpoint<ReferenceProvider>,
        metrics: ApiMetrics,
    ) -> Self {
        Self {
            config: Arc::new(config),
            endpoint: Arc::new(endpoint),
            metrics,
        }
    }
}
