// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! [`IdBackend`]: the entry point adapters call into.

use crate::applicator::{apply_claim, applicator_for, Applicator, RangeApplicator};
use crate::cache::CacheInstance;
use crate::reconcile::{restore, save_all, RestoreReport};
use crate::storage::{open_storage, BackendStorage};
use ahash::AHashMap;
use idspace_config::IdspaceConfig;
use idspace_structures::{IdClaim, IdEntry, IdError, IdIndex, IdResult, IndexKey};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct BackendState {
    caches: AHashMap<IndexKey, CacheInstance>,
    indexes: AHashMap<IndexKey, IdIndex>,
}

/// Allocation backend over every registered index.
///
/// All mutating operations take one exclusive lock for their whole duration,
/// so a claim, its entry writes and its claim record are applied atomically
/// with respect to other callers. Nested operations (reserved-range sync from
/// `create_index`) call the `*_locked` helpers and never re-acquire it.
pub struct IdBackend {
    state: RwLock<BackendState>,
    storage: Arc<dyn BackendStorage>,
}

impl IdBackend {
    pub fn new(storage: Arc<dyn BackendStorage>) -> Self {
        Self {
            state: RwLock::new(BackendState::default()),
            storage,
        }
    }

    /// Open the configured storage and create every configured index
    pub fn from_config(config: &IdspaceConfig) -> IdResult<Self> {
        let backend = Self::new(open_storage(&config.storage)?);
        for index_config in &config.indexes {
            backend.create_index(&index_config.to_index())?;
        }
        Ok(backend)
    }

    pub fn storage(&self) -> &Arc<dyn BackendStorage> {
        &self.storage
    }

    /// Register (or update) an index.
    ///
    /// The first call for an index restores its cache from storage. Every call
    /// re-syncs the reserved spans with the index's current min/max bounds.
    pub fn create_index(&self, index: &IdIndex) -> IdResult<()> {
        index.validate()?;
        let key = index.key();
        let mut state = self.state.write();

        if let Some(cache) = state.caches.get(&key) {
            if cache.id_type() != index.id_type {
                return Err(IdError::InvalidIndex(format!(
                    "index {} is {}, cannot change to {}",
                    key,
                    cache.id_type(),
                    index.id_type
                )));
            }
        }

        let cache = state
            .caches
            .entry(key.clone())
            .or_insert_with(|| CacheInstance::new(index.id_type));
        if !cache.is_initialized() {
            match self.initialize_cache(index, cache) {
                Ok(report) => debug!(target: "idspace-backend", "[{}] {:?}", key, report),
                Err(err) => {
                    state.caches.remove(&key);
                    warn!(target: "idspace-backend", "[{}] restore failed: {}", key, err);
                    return Err(err);
                }
            }
        }
        let previous = state.indexes.insert(key.clone(), index.clone());
        if let Err(err) = self.sync_reserved_locked(&mut *state, index) {
            warn!(target: "idspace-backend", "[{}] bounds not applied: {}", key, err);
            if let Some(previous) = previous {
                state.indexes.insert(key, previous);
            }
            return Err(err);
        }
        info!(
            target: "idspace-backend",
            "Index {} ready ({}, {} slots)",
            key,
            index.id_type,
            state.caches.get(&key).map_or(0, CacheInstance::size)
        );
        Ok(())
    }

    fn initialize_cache(&self, index: &IdIndex, cache: &mut CacheInstance) -> IdResult<RestoreReport> {
        let report = restore(self.storage.as_ref(), index, cache)?;
        save_all(self.storage.as_ref(), &index.key(), cache)?;
        cache.set_initialized();
        Ok(report)
    }

    /// Desired boundary claims are applied, withdrawn ones released
    fn sync_reserved_locked(&self, state: &mut BackendState, index: &IdIndex) -> IdResult<()> {
        for (name, desired) in index.reserved_claims() {
            match desired {
                Some(mut claim) => self.claim_locked(state, &mut claim)?,
                None => {
                    let stale = index.reserved_claim(name, None);
                    self.release_locked(state, &stale, &mut RangeApplicator::default())?;
                }
            }
        }
        Ok(())
    }

    /// Drop an index: its entries, its boundary claims and its cache.
    ///
    /// Claims created by callers stay in storage as pending, keeping their
    /// last id or range; the restore of a recreated index applies them again.
    pub fn delete_index(&self, key: &IndexKey) -> IdResult<()> {
        let mut state = self.state.write();
        for entry in self.storage.list_entries(key)? {
            self.storage.delete_entry(&entry)?;
        }
        for mut claim in self.storage.list_claims(key, None)? {
            if claim.is_index_owned() {
                self.storage.delete_claim(&claim)?;
            } else {
                claim.set_pending(format!("index {} was deleted", key));
                self.storage.update_claim(&claim)?;
            }
        }
        state.caches.remove(key);
        state.indexes.remove(key);
        info!(target: "idspace-backend", "Index {} deleted", key);
        Ok(())
    }

    /// Allocate for `claim` and write the result into its status.
    ///
    /// On failure the claim is marked failed (keeping any previous id) and the
    /// cache is left unchanged.
    pub fn claim(&self, claim: &mut IdClaim) -> IdResult<()> {
        let mut state = self.state.write();
        self.claim_locked(&mut *state, claim)
    }

    fn claim_locked(&self, state: &mut BackendState, claim: &mut IdClaim) -> IdResult<()> {
        let key = claim.index_key();
        let BackendState { caches, indexes } = state;
        let cache = match caches.get_mut(&key).filter(|c| c.is_initialized()) {
            Some(cache) => cache,
            None => return Err(IdError::CacheNotInitialized(key.to_string())),
        };
        let index = indexes
            .get(&key)
            .ok_or_else(|| IdError::CacheNotInitialized(key.to_string()))?;

        if let Err(err) = claim
            .validate_syntax(index)
            .and_then(|_| apply_claim(cache, claim))
        {
            debug!(target: "idspace-backend", "Claim '{}' rejected: {}", claim.name, err);
            claim.set_failed(err.to_string());
            return Err(err);
        }

        if let Err(err) = self.persist_claim(&key, cache, claim) {
            warn!(target: "idspace-backend", "Claim '{}' applied but not saved: {}", claim.name, err);
            claim.set_failed(err.to_string());
            return Err(err);
        }
        debug!(
            target: "idspace-backend",
            "Claim '{}' ready: {}",
            claim.name,
            claim.status.id.as_deref().or(claim.status.range.as_deref()).unwrap_or_default()
        );
        Ok(())
    }

    fn persist_claim(&self, key: &IndexKey, cache: &CacheInstance, claim: &IdClaim) -> IdResult<()> {
        save_all(self.storage.as_ref(), key, cache)?;
        match self.storage.update_claim(claim) {
            Err(IdError::NotFound(_)) => self.storage.create_claim(claim),
            other => other,
        }
    }

    /// Release everything `claim` holds and forget its record
    pub fn release(&self, claim: &IdClaim) -> IdResult<()> {
        let mut state = self.state.write();
        let mut applicator = applicator_for(claim)?;
        self.release_locked(&mut *state, claim, applicator.as_mut())
    }

    fn release_locked(
        &self,
        state: &mut BackendState,
        claim: &IdClaim,
        applicator: &mut dyn Applicator,
    ) -> IdResult<()> {
        let key = claim.index_key();
        let cache = state
            .caches
            .get_mut(&key)
            .filter(|c| c.is_initialized())
            .ok_or_else(|| IdError::CacheNotInitialized(key.to_string()))?;
        applicator.delete(cache, claim)?;
        match self.storage.delete_claim(claim) {
            Ok(()) | Err(IdError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        save_all(self.storage.as_ref(), &key, cache)?;
        Ok(())
    }

    /// Occupied slots of an index (tree plus range tables)
    pub fn index_size(&self, key: &IndexKey) -> IdResult<usize> {
        self.state
            .read()
            .caches
            .get(key)
            .map(CacheInstance::size)
            .ok_or_else(|| IdError::CacheNotInitialized(key.to_string()))
    }

    /// Current entry images of an index, as the store should hold them
    pub fn list_entries(&self, key: &IndexKey) -> IdResult<Vec<IdEntry>> {
        let state = self.state.read();
        let cache = state
            .caches
            .get(key)
            .ok_or_else(|| IdError::CacheNotInitialized(key.to_string()))?;
        cache.materialize(key)
    }

    pub fn is_initialized(&self, key: &IndexKey) -> bool {
        self.state
            .read()
            .caches
            .get(key)
            .map_or(false, CacheInstance::is_initialized)
    }

    pub fn get_index(&self, key: &IndexKey) -> Option<IdIndex> {
        self.state.read().indexes.get(key).cloned()
    }

    pub fn list_indexes(&self) -> Vec<IndexKey> {
        let mut keys: Vec<IndexKey> = self.state.read().indexes.keys().cloned().collect();
        keys.sort();
        keys
    }
}
