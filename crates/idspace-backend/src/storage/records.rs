// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use idspace_structures::{IdClaim, IdEntry, IdError, IdResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Claims and entries of one index, keyed by record name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecords {
    #[serde(default)]
    pub claims: BTreeMap<String, IdClaim>,
    #[serde(default)]
    pub entries: BTreeMap<String, IdEntry>,
}

impl IndexRecords {
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty() && self.entries.is_empty()
    }

    pub fn entries(&self) -> Vec<IdEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn claims(&self, owner_kind: Option<&str>) -> Vec<IdClaim> {
        self.claims
            .values()
            .filter(|c| owner_kind.map_or(true, |kind| c.owner.kind() == kind))
            .cloned()
            .collect()
    }

    pub fn create_entry(&mut self, entry: &IdEntry) -> IdResult<()> {
        if self.entries.contains_key(&entry.name) {
            return Err(IdError::AlreadyExists(format!("entry '{}'", entry.name)));
        }
        self.entries.insert(entry.name.clone(), entry.clone());
        Ok(())
    }

    pub fn update_entry(&mut self, entry: &IdEntry) -> IdResult<()> {
        match self.entries.get_mut(&entry.name) {
            Some(stored) => {
                *stored = entry.clone();
                Ok(())
            }
            None => Err(IdError::NotFound(format!("entry '{}'", entry.name))),
        }
    }

    pub fn delete_entry(&mut self, entry: &IdEntry) -> IdResult<()> {
        self.entries
            .remove(&entry.name)
            .map(|_| ())
            .ok_or_else(|| IdError::NotFound(format!("entry '{}'", entry.name)))
    }

    pub fn create_claim(&mut self, claim: &IdClaim) -> IdResult<()> {
        if self.claims.contains_key(&claim.name) {
            return Err(IdError::AlreadyExists(format!("claim '{}'", claim.name)));
        }
        self.claims.insert(claim.name.clone(), claim.clone());
        Ok(())
    }

    pub fn update_claim(&mut self, claim: &IdClaim) -> IdResult<()> {
        match self.claims.get_mut(&claim.name) {
            Some(stored) => {
                *stored = claim.clone();
                Ok(())
            }
            None => Err(IdError::NotFound(format!("claim '{}'", claim.name))),
        }
    }

    pub fn delete_claim(&mut self, claim: &IdClaim) -> IdResult<()> {
        self.claims
            .remove(&claim.name)
            .map(|_| ())
            .ok_or_else(|| IdError::NotFound(format!("claim '{}'", claim.name)))
    }
}
