//! DPoP proof as reported by the proof-of-possession validator.

use serde::{Deserialize, Serialize};

/// A validated DPoP proof.
///
/// Only the fields the endpoint acts on are kept: `jti` for replay detection
/// and the key thumbprint for the `jkt` binding check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpopProof {
    /// Unique identifier of the proof JWT.
    pub jti: String,
    /// RFC 7638 SHA-256 thumbprint of the proof's public key.
    pub thumbprint: String,
    /// Proof issuance time, seconds since the epoch.
    pub iat: i64,
}
