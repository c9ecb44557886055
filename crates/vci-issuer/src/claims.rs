//! # Claims Mask
//!
//! Decides which of an account's claim values are released. Claims are
//! admitted by scope (through the scope → claims table) and by explicit
//! request, then rejected claims are removed. `sub` is always released.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use serde_json::{Map, Value};
use vci_core::ScopeSet;

/// Accumulates the claim filter for one response.
#[derive(Debug)]
pub struct ClaimsMask<'a> {
    available: Map<String, Value>,
    table: &'a BTreeMap<String, Vec<String>>,
    filter: Map<String, Value>,
}

impl<'a> ClaimsMask<'a> {
    /// Start a mask over the account's available claims.
    ///
    /// Fails when `available` has no string `sub`.
    pub fn new(
        available: Map<String, Value>,
        table: &'a BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        if !available.get("sub").is_some_and(Value::is_string) {
            bail!("account claims must contain a string sub");
        }
        let mut filter = Map::new();
        filter.insert("sub".to_string(), Value::Null);
        Ok(Self {
            available,
            table,
            filter,
        })
    }

    /// Admit every claim mapped from the given scope values.
    pub fn scope(&mut self, scope: &ScopeSet) -> &mut Self {
        for value in scope.iter() {
            if let Some(claims) = self.table.get(value) {
                for claim in claims {
                    self.filter.entry(claim.clone()).or_insert(Value::Null);
                }
            }
        }
        self
    }

    /// Admit explicitly requested claims.
    pub fn mask(&mut self, requested: &Map<String, Value>) -> &mut Self {
        for (name, request) in requested {
            self.filter.insert(name.clone(), request.clone());
        }
        self
    }

    /// Remove rejected claims. `sub` cannot be rejected.
    pub fn rejected(&mut self, rejected: &BTreeSet<String>) -> &mut Self {
        for claim in rejected {
            if claim != "sub" {
                self.filter.remove(claim);
            }
        }
        self
    }

    /// The admitted claims present in the account's available claims.
    ///
    /// Only plain (`null`) and object-form claim requests admit a claim.
    pub fn result(&self) -> Map<String, Value> {
        self.filter
            .iter()
            .filter(|(_, request)| request.is_null() || request.is_object())
            .filter_map(|(name, _)| {
                self.available
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }
}
