// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for backend integration tests

#![allow(dead_code)]

use idspace_backend::{BackendStorage, IdBackend, MemoryStorage};
use idspace_structures::labels::LABEL_CLAIM_NAME;
use idspace_structures::{
    ClaimOwner, IdClaim, IdEntry, IdError, IdIndex, IdResult, IdType, IndexKey, LabelSelector,
    ObjectReference,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const NAMESPACE: &str = "default";
pub const INDEX: &str = "vlan";

pub fn owner(name: &str) -> ClaimOwner {
    ClaimOwner::Object(ObjectReference {
        group: "network.example.com".to_string(),
        version: "v1alpha1".to_string(),
        kind: "Interface".to_string(),
        namespace: NAMESPACE.to_string(),
        name: name.to_string(),
    })
}

pub fn dynamic_claim(name: &str) -> IdClaim {
    IdClaim::new(NAMESPACE, name, INDEX, owner(name))
}

pub fn static_claim(name: &str, id: u64) -> IdClaim {
    dynamic_claim(name).with_id(id)
}

pub fn range_claim(name: &str, range: &str) -> IdClaim {
    dynamic_claim(name).with_range(range)
}

/// Dynamic claim drawing from the range claimed by `range_claim_name`
pub fn child_claim(name: &str, range_claim_name: &str) -> IdClaim {
    dynamic_claim(name)
        .with_selector(LabelSelector::default().with_label(LABEL_CLAIM_NAME, range_claim_name))
}

pub fn index_key() -> IndexKey {
    IndexKey::new(NAMESPACE, INDEX)
}

pub fn test_index(id_type: IdType) -> IdIndex {
    IdIndex::new(NAMESPACE, INDEX, id_type).with_uid("0b6f5d4e-index-uid")
}

/// Backend over fresh memory storage with one 16-bit index
pub fn create_test_backend() -> (IdBackend, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let backend = IdBackend::new(storage.clone());
    backend
        .create_index(&test_index(IdType::Id16))
        .expect("Failed to create index");
    (backend, storage)
}

pub fn sorted_entries(mut entries: Vec<IdEntry>) -> Vec<IdEntry> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Assert the store holds exactly what the cache materializes
pub fn assert_mirrored(backend: &IdBackend, storage: &dyn BackendStorage) {
    let key = index_key();
    let cached = sorted_entries(backend.list_entries(&key).expect("list cached entries"));
    let stored = sorted_entries(storage.list_entries(&key).expect("list stored entries"));
    assert_eq!(cached, stored, "store diverged from cache");
}

/// Entries held by `claim_name`
pub fn entries_of(backend: &IdBackend, claim_name: &str) -> Vec<IdEntry> {
    backend
        .list_entries(&index_key())
        .expect("list entries")
        .into_iter()
        .filter(|e| e.claim_name == claim_name)
        .collect()
}

/// Memory storage whose writes can be switched off
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    pub fail_writes: AtomicBool,
}

impl FlakyStorage {
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> IdResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(IdError::Storage("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl BackendStorage for FlakyStorage {
    fn list_entries(&self, index: &IndexKey) -> IdResult<Vec<IdEntry>> {
        self.inner.list_entries(index)
    }

    fn create_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.check()?;
        self.inner.create_entry(entry)
    }

    fn update_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.check()?;
        self.inner.update_entry(entry)
    }

    fn delete_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.check()?;
        self.inner.delete_entry(entry)
    }

    fn list_claims(&self, index: &IndexKey, owner_kind: Option<&str>) -> IdResult<Vec<IdClaim>> {
        self.inner.list_claims(index, owner_kind)
    }

    fn create_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.check()?;
        self.inner.create_claim(claim)
    }

    fn update_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.check()?;
        self.inner.update_claim(claim)
    }

    fn delete_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.check()?;
        self.inner.delete_claim(claim)
    }
}
