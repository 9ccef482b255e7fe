// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cache <-> durable store reconciliation: restore on startup, save after mutations.

use crate::applicator::{apply_claim, claim_in};
use crate::cache::CacheInstance;
use crate::storage::BackendStorage;
use idspace_structures::{
    is_reserved_range, parse_id, ClaimType, ConditionReason, IdBlock, IdClaim, IdEntry, IdError,
    IdIndex, IdResult, IndexKey,
};
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// Outcome of a cache restore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub replayed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Store writes issued by one save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SaveReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// True for the boundary claims an index owns itself
pub(crate) fn is_index_reserved(claim: &IdClaim, index: &IdIndex) -> bool {
    claim.is_index_owned() && is_reserved_range(&index.name, &claim.name)
}

/// Rebuild `cache` from the durable claims of `index`.
///
/// Reserved spans go in first, then stored claims in three passes (ranges,
/// static ids, dynamic ids), each ordered by claim name so the result does not
/// depend on storage listing order. Single-id claims are put back at the slot
/// their entry records. A claim that no longer applies is marked failed and
/// persisted, the rest of the restore continues; failed claims are not
/// replayed again until a caller claims them.
pub(crate) fn restore(
    storage: &dyn BackendStorage,
    index: &IdIndex,
    cache: &mut CacheInstance,
) -> IdResult<RestoreReport> {
    let key = index.key();
    let entries = storage.list_entries(&key)?;
    let claims = storage.list_claims(&key, None)?;
    let mut report = RestoreReport::default();

    for (name, desired) in index.reserved_claims() {
        if let Some(mut claim) = desired {
            debug!(target: "idspace-backend", "[{}] seeding reserved range '{}'", key, name);
            apply_claim(cache, &mut claim)?;
        }
    }

    for pass in [ClaimType::Range, ClaimType::StaticId, ClaimType::DynamicId] {
        let mut batch: Vec<&IdClaim> = claims
            .iter()
            .filter(|c| c.claim_type() == pass && !is_index_reserved(c, index))
            .collect();
        batch.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        for claim in batch {
            replay(storage, index, cache, &entries, claim.clone(), &mut report)?;
        }
    }

    for claim in claims
        .iter()
        .filter(|c| c.claim_type() == ClaimType::Invalid)
    {
        warn!(
            target: "idspace-backend",
            "[{}] skipping claim '{}' with both id and range set",
            key,
            claim.name
        );
        report.skipped += 1;
    }

    info!(
        target: "idspace-backend",
        "[{}] restored {} claim(s), {} failed, {} skipped",
        key,
        report.replayed,
        report.failed,
        report.skipped
    );
    Ok(report)
}

fn replay(
    storage: &dyn BackendStorage,
    index: &IdIndex,
    cache: &mut CacheInstance,
    entries: &[IdEntry],
    mut claim: IdClaim,
    report: &mut RestoreReport,
) -> IdResult<()> {
    if claim.status.condition.reason == ConditionReason::Failed {
        debug!(
            target: "idspace-backend",
            "[{}] claim '{}' stays failed until it is claimed again",
            index.key(),
            claim.name
        );
        report.skipped += 1;
        return Ok(());
    }

    let before = claim.status.clone();
    let owned: Vec<&IdEntry> = entries.iter().filter(|e| e.is_owned_by(&claim)).collect();
    let single_id = claim.claim_type() != ClaimType::Range;

    let result = if single_id && claim.is_ready() && owned.is_empty() {
        // the range holding it was resized or released after it was claimed
        Err(IdError::NotFound(format!(
            "allocation of claim '{}' was released with its parent range",
            claim.name
        )))
    } else {
        if single_id && claim.status_id().is_none() {
            // a claim that crashed before its status was written still has an entry
            if let [entry] = owned.as_slice() {
                if let Ok(id) = parse_id(&entry.id) {
                    debug!(
                        target: "idspace-backend",
                        "Recovered id {} of claim '{}' from its entry",
                        id,
                        claim.name
                    );
                    claim.status.id = Some(id.to_string());
                }
            }
        }
        let snapshot = cache.clone();
        if single_id {
            if let [entry] = owned.as_slice() {
                seed_entry(cache, &claim, entry);
            }
        }
        let result = claim
            .validate_syntax(index)
            .and_then(|_| apply_claim(cache, &mut claim));
        if result.is_err() {
            *cache = snapshot;
        }
        result
    };

    match result {
        Ok(()) => report.replayed += 1,
        Err(err) => {
            warn!(
                target: "idspace-backend",
                "Claim '{}' could not be restored into {}: {}",
                claim.name,
                index.key(),
                err
            );
            claim.set_failed(err.to_string());
            report.failed += 1;
        }
    }

    if claim.status != before {
        storage.update_claim(&claim)?;
    }
    Ok(())
}

/// Put a claim's stored slot back in the table it was saved from, so the
/// applicator reclaims it in place instead of choosing again
fn seed_entry(cache: &mut CacheInstance, claim: &IdClaim, entry: &IdEntry) {
    let block = match IdBlock::parse(&entry.id) {
        Ok(block) if block.is_single() => block,
        _ => return,
    };
    if let Err(err) = claim_in(cache, entry.range_name.as_deref(), block, claim) {
        trace!(
            target: "idspace-backend",
            "Slot {} of claim '{}' not seeded: {}",
            entry.id,
            claim.name,
            err
        );
    }
}

/// Make the stored entries of `key` match the cache exactly
pub(crate) fn save_all(
    storage: &dyn BackendStorage,
    key: &IndexKey,
    cache: &CacheInstance,
) -> IdResult<SaveReport> {
    let desired: BTreeMap<(String, String), IdEntry> = cache
        .materialize(key)?
        .into_iter()
        .map(|e| ((e.namespace.clone(), e.name.clone()), e))
        .collect();
    let stored: BTreeMap<(String, String), IdEntry> = storage
        .list_entries(key)?
        .into_iter()
        .map(|e| ((e.namespace.clone(), e.name.clone()), e))
        .collect();

    let mut report = SaveReport::default();
    for (name, entry) in &desired {
        match stored.get(name) {
            None => {
                storage.create_entry(entry)?;
                report.created += 1;
            }
            Some(existing) if existing != entry => {
                storage.update_entry(entry)?;
                report.updated += 1;
            }
            Some(_) => {}
        }
    }
    for (name, entry) in &stored {
        if !desired.contains_key(name) {
            storage.delete_entry(entry)?;
            report.deleted += 1;
        }
    }

    if !report.is_noop() {
        debug!(
            target: "idspace-backend",
            "[{}] saved entries: {} created, {} updated, {} deleted",
            key,
            report.created,
            report.updated,
            report.deleted
        );
    }
    Ok(report)
}
