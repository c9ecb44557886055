//! Client and account records resolved for each request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A registered OAuth client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Client identifier.
    pub client_id: String,
    /// Registered metadata, kept opaque.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// An end-user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier, released as `sub`.
    pub account_id: String,
    /// Available claim values keyed by claim name.
    #[serde(default)]
    pub claims: Map<String, Value>,
}
