// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use super::{BackendStorage, IndexRecords};
use ahash::AHashMap;
use idspace_structures::{IdClaim, IdEntry, IdResult, IndexKey};
use parking_lot::RwLock;

/// Process-local storage; contents are lost when dropped
#[derive(Default)]
pub struct MemoryStorage {
    indexes: RwLock<AHashMap<IndexKey, IndexRecords>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything stored for `index`
    pub fn snapshot(&self, index: &IndexKey) -> IndexRecords {
        self.indexes.read().get(index).cloned().unwrap_or_default()
    }

    fn with_records<T>(
        &self,
        index: IndexKey,
        f: impl FnOnce(&mut IndexRecords) -> IdResult<T>,
    ) -> IdResult<T> {
        let mut indexes = self.indexes.write();
        let records = indexes.entry(index.clone()).or_default();
        let result = f(records);
        if records.is_empty() {
            indexes.remove(&index);
        }
        result
    }
}

impl BackendStorage for MemoryStorage {
    fn list_entries(&self, index: &IndexKey) -> IdResult<Vec<IdEntry>> {
        Ok(self
            .indexes
            .read()
            .get(index)
            .map(IndexRecords::entries)
            .unwrap_or_default())
    }

    fn create_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.with_records(entry.index_key(), |r| r.create_entry(entry))
    }

    fn update_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.with_records(entry.index_key(), |r| r.update_entry(entry))
    }

    fn delete_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.with_records(entry.index_key(), |r| r.delete_entry(entry))
    }

    fn list_claims(&self, index: &IndexKey, owner_kind: Option<&str>) -> IdResult<Vec<IdClaim>> {
        Ok(self
            .indexes
            .read()
            .get(index)
            .map(|r| r.claims(owner_kind))
            .unwrap_or_default())
    }

    fn create_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.with_records(claim.index_key(), |r| r.create_claim(claim))
    }

    fn update_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.with_records(claim.index_key(), |r| r.update_claim(claim))
    }

    fn delete_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.with_records(claim.index_key(), |r| r.delete_claim(claim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idspace_structures::{ClaimOwner, IdError};

    fn claim(name: &str) -> IdClaim {
        IdClaim::new(
            "default",
            name,
            "vlan",
            ClaimOwner::Internal {
                kind: "Test".to_string(),
            },
        )
    }

    #[test]
    fn test_claim_crud() {
        let storage = MemoryStorage::new();
        let key = IndexKey::new("default", "vlan");
        let mut c = claim("a");

        storage.create_claim(&c).unwrap();
        assert!(matches!(storage.create_claim(&c), Err(IdError::AlreadyExists(_))));

        c.set_ready_id("7");
        storage.update_claim(&c).unwrap();
        let listed = storage.list_claims(&key, None).unwrap();
        assert_eq!(listed, vec![c.clone()]);
        assert!(storage.list_claims(&key, Some("Other")).unwrap().is_empty());

        storage.delete_claim(&c).unwrap();
        assert!(matches!(storage.delete_claim(&c), Err(IdError::NotFound(_))));
        assert!(matches!(storage.update_claim(&c), Err(IdError::NotFound(_))));
        assert!(storage.snapshot(&key).is_empty());
    }
}
