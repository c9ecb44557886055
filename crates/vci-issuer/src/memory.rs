//! # In-Memory Stores
//!
//! `DashMap`-backed implementations of the persistence collaborators, for
//! development deployments and tests. Records are seeded from a YAML fixture
//! file at startup and never mutated by the pipeline.
//!
//! Cheaply cloneable via `Arc`: all clones share the same data.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vci_core::{AccessToken, Account, ClaimsClass, Client, Grant, ScopeSet};

use crate::context::RequestContext;
use crate::provider::{AccountResolver, ClientStore, GrantStore, ReplayDetection, TokenStore};

/// Seed records for a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub tokens: Vec<AccessToken>,
    pub clients: Vec<Client>,
    pub accounts: Vec<Account>,
    pub grants: Vec<Grant>,
}

impl Fixtures {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

struct Inner {
    tokens: DashMap<String, AccessToken>,
    clients: DashMap<String, Client>,
    accounts: DashMap<String, Account>,
    grants: DashMap<String, Grant>,
}

/// Token, client, account and grant records held in memory.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tokens", &self.inner.tokens.len())
            .field("clients", &self.inner.clients.len())
            .field("accounts", &self.inner.accounts.len())
            .field("grants", &self.inner.grants.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tokens: DashMap::new(),
                clients: DashMap::new(),
                accounts: DashMap::new(),
                grants: DashMap::new(),
            }),
        }
    }

    pub fn from_fixtures(fixtures: Fixtures) -> Self {
        let store = Self::new();
        fixtures.tokens.into_iter().for_each(|t| store.insert_token(t));
        fixtures.clients.into_iter().for_each(|c| store.insert_client(c));
        fixtures.accounts.into_iter().for_each(|a| store.insert_account(a));
        fixtures.grants.into_iter().for_each(|g| store.insert_grant(g));
        store
    }

    pub fn insert_token(&self, token: AccessToken) {
        self.inner.tokens.insert(token.value.clone(), token);
    }

    pub fn insert_client(&self, client: Client) {
        self.inner.clients.insert(client.client_id.clone(), client);
    }

    pub fn insert_account(&self, account: Account) {
        self.inner.accounts.insert(account.account_id.clone(), account);
    }

    pub fn insert_grant(&self, grant: Grant) {
        self.inner.grants.insert(grant.grant_id.clone(), grant);
    }

    /// Raw token record, expired or not.
    pub fn token(&self, value: &str) -> Option<AccessToken> {
        self.inner.tokens.get(value).map(|t| t.clone())
    }

    pub fn client(&self, client_id: &str) -> Option<Client> {
        self.inner.clients.get(client_id).map(|c| c.clone())
    }

    pub fn account(&self, account_id: &str) -> Option<Account> {
        self.inner.accounts.get(account_id).map(|a| a.clone())
    }

    /// Raw grant record, expired or not.
    pub fn grant(&self, grant_id: &str) -> Option<Grant> {
        self.inner.grants.get(grant_id).map(|g| g.clone())
    }

    /// Record counts as `(tokens, clients, accounts, grants)`.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.inner.tokens.len(),
            self.inner.clients.len(),
            self.inner.accounts.len(),
            self.inner.grants.len(),
        )
    }
}

impl TokenStore for MemoryStore {
    async fn find_token(&self, value: &str) -> Result<Option<AccessToken>> {
        let now = Utc::now();
        Ok(self.token(value).filter(|t| !t.is_expired_at(now)))
    }
}

impl ClientStore for MemoryStore {
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        Ok(self.client(client_id))
    }
}

impl AccountResolver for MemoryStore {
    async fn find_account(
        &self, _ctx: &RequestContext, account_id: &str, _token: &AccessToken,
    ) -> Result<Option<Account>> {
        Ok(self.account(account_id))
    }

    async fn account_claims(
        &self, account: &Account, _class: ClaimsClass, _scope: &ScopeSet,
        _claims: &Map<String, Value>, _rejected: &BTreeSet<String>,
    ) -> Result<Map<String, Value>> {
        let mut claims = account.claims.clone();
        claims.insert("sub".to_string(), Value::String(account.account_id.clone()));
        Ok(claims)
    }
}

impl GrantStore for MemoryStore {
    async fn find_grant(&self, grant_id: &str, ignore_expiration: bool) -> Result<Option<Grant>> {
        let now = Utc::now();
        Ok(self
            .grant(grant_id)
            .filter(|g| ignore_expiration || !g.is_expired_at(now)))
    }
}

// ── Replay cache ────────────────────────────────────────────────────

const PURGE_EVERY: u64 = 1024;

/// Single-use registry of `(client_id, jti)` pairs.
///
/// Check and registration happen under the map's entry lock, so two
/// concurrent requests presenting the same proof cannot both succeed.
/// Expired entries are purged lazily, once every 1024 registrations.
#[derive(Debug, Clone, Default)]
pub struct ReplayCache {
    entries: Arc<DashMap<(String, String), DateTime<Utc>>>,
    registrations: Arc<AtomicU64>,
}

impl ReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the pair as of `now`. Returns `false` if it is already
    /// registered with an expiry after `now`.
    pub fn unique_at(
        &self,
        client_id: &str,
        jti: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        let fresh = match self.entries.entry((client_id.to_owned(), jti.to_owned())) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    false
                } else {
                    entry.insert(expires_at);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                true
            }
        };

        if fresh && self.registrations.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1
        {
            self.purge_expired(now);
        }
        fresh
    }

    /// Drop entries whose window has passed. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReplayDetection for ReplayCache {
    async fn unique(
        &self, ctx: &RequestContext, client_id: &str, jti: &str, expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.unique_at(client_id, jti, expires_at, ctx.now))
    }
}
