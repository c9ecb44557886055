//! # Issuer Configuration
//!
//! What the credential endpoint is allowed to mint and how strictly it treats
//! proof-of-possession. Loaded once at startup from YAML and shared read-only
//! by every request.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vci_core::SupportedCredentialConfig;

use crate::jws::SUPPORTED_ALGS;

/// Errors loading or validating an [`IssuerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read issuer config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid YAML for this schema.
    #[error("failed to parse issuer config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration parsed but is semantically invalid.
    #[error("invalid issuer config: {errors:?}")]
    Invalid { errors: Vec<String> },
}

/// DPoP proof acceptance tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpopConfig {
    /// Maximum distance, in seconds, between a proof's `iat` and the server
    /// clock.
    pub iat_tolerance_secs: i64,
}

impl Default for DpopConfig {
    fn default() -> Self {
        Self {
            iat_tolerance_secs: 60,
        }
    }
}

/// Credential issuer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Issuer identifier. Used as the challenge realm and the expected `aud`
    /// of key proofs.
    pub issuer: String,
    /// JWS algorithms accepted for DPoP proofs, advertised in DPoP
    /// challenges.
    pub dpop_signing_alg_values: Vec<String>,
    /// Credentials this issuer can mint.
    pub credentials_supported: Vec<SupportedCredentialConfig>,
    /// Scope value to the claim names it releases.
    pub claims: BTreeMap<String, Vec<String>>,
    /// DPoP tolerances.
    pub dpop: DpopConfig,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            dpop_signing_alg_values: vec!["ES256".to_string(), "EdDSA".to_string()],
            credentials_supported: Vec::new(),
            claims: default_claims(),
            dpop: DpopConfig::default(),
        }
    }
}

impl IssuerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.issuer.trim().is_empty() {
            errors.push("issuer must not be empty".to_string());
        }
        if self.dpop_signing_alg_values.is_empty() {
            errors.push("dpop_signing_alg_values must not be empty".to_string());
        }
        for alg in &self.dpop_signing_alg_values {
            if !SUPPORTED_ALGS.contains(&alg.as_str()) {
                errors.push(format!(
                    "dpop_signing_alg_values lists '{alg}'; supported: {}",
                    SUPPORTED_ALGS.join(", ")
                ));
            }
        }
        if self.dpop.iat_tolerance_secs <= 0 {
            errors.push("dpop.iat_tolerance_secs must be positive".to_string());
        }
        for (i, credential) in self.credentials_supported.iter().enumerate() {
            if credential.format.is_empty() {
                errors.push(format!("credentials_supported[{i}].format must not be empty"));
            }
            if credential.id.as_deref() == Some("openid") {
                errors.push(format!("credentials_supported[{i}].id must not be 'openid'"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { errors })
        }
    }

    /// Identifiers of the configured credentials, in configuration order.
    /// Credentials without an `id` are not reachable by scope.
    pub fn supported_credential_ids(&self) -> Vec<&str> {
        self.credentials_supported
            .iter()
            .filter_map(|c| c.id.as_deref())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// Standard OpenID Connect scope to claims mapping.
pub fn default_claims() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 5] = [
        ("openid", &["sub"]),
        (
            "profile",
            &[
                "birthdate",
                "family_name",
                "gender",
                "given_name",
                "locale",
                "middle_name",
                "name",
                "nickname",
                "picture",
                "preferred_username",
                "profile",
                "updated_at",
                "website",
                "zoneinfo",
            ],
        ),
        ("email", &["email", "email_verified"]),
        ("address", &["address"]),
        ("phone", &["phone_number", "phone_number_verified"]),
    ];
    table
        .iter()
        .map(|(scope, claims)| {
            (
                scope.to_string(),
                claims.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}
