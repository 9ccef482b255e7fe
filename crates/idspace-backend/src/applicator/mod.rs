// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Claim applicators.

Each claim type gets an applicator implementing the same three-step
protocol against a [`CacheInstance`]:

1. `validate`: type-specific checks; the range applicator may also tear
   down a stale allocation here
2. `apply`: allocate (or refresh) and write the result into the claim status
3. `delete`: release everything the claim owns

Callers run `validate` then `apply` through [`apply_claim`], which restores
the cache snapshot if either step fails.
*/

mod dynamic_id;
mod range;
mod static_id;

pub use dynamic_id::DynamicApplicator;
pub use range::RangeApplicator;
pub use static_id::StaticApplicator;

use crate::cache::{is_range_slot, CacheInstance, OwnedSlot};
use idspace_structures::{is_reserved_range, ClaimType, IdBlock, IdClaim, IdError, IdResult};
use idspace_table::SlotEntry;
use std::collections::BTreeSet;
use tracing::debug;

pub trait Applicator {
    fn validate(&mut self, cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()>;
    fn apply(&mut self, cache: &mut CacheInstance, claim: &mut IdClaim) -> IdResult<()>;
    fn delete(&mut self, cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()>;
}

/// Pick the applicator for the claim's type
pub fn applicator_for(claim: &IdClaim) -> IdResult<Box<dyn Applicator>> {
    match claim.claim_type() {
        ClaimType::StaticId => Ok(Box::new(StaticApplicator)),
        ClaimType::DynamicId => Ok(Box::new(DynamicApplicator)),
        ClaimType::Range => Ok(Box::new(RangeApplicator::default())),
        ClaimType::Invalid => Err(IdError::InvalidClaimType(claim.name.clone())),
    }
}

/// Validate and apply `claim`; on error the cache is left as it was
pub fn apply_claim(cache: &mut CacheInstance, claim: &mut IdClaim) -> IdResult<()> {
    let mut applicator = applicator_for(claim)?;
    let snapshot = cache.clone();
    let result = applicator
        .validate(cache, claim)
        .and_then(|_| applicator.apply(cache, claim));
    if result.is_err() {
        *cache = snapshot;
    }
    result
}

/// Find the slot a claim already owns, keeping only the one at `keep`.
///
/// With `keep` set, owned slots at any other id are released as stale and
/// the slot at `keep` (if still owned) is returned. Without it, a single
/// owned slot is returned as-is. Two or more survivors is an error.
pub(crate) fn reclaim_owned(
    cache: &mut CacheInstance,
    claim: &IdClaim,
    keep: Option<u64>,
) -> IdResult<Option<OwnedSlot>> {
    let mut owned = cache.slots_matching(&claim.owner_selector());
    if let Some(id) = keep {
        let (matching, stale): (Vec<_>, Vec<_>) = owned
            .into_iter()
            .partition(|s| s.entry.block == IdBlock::single(id));
        for slot in &stale {
            debug!(
                target: "idspace-backend",
                "Dropping stale id {} of claim '{}'",
                slot.id_string(),
                claim.name
            );
            cache.release_slot(slot);
        }
        owned = matching;
    }
    if owned.len() > 1 {
        let ids: Vec<String> = owned.iter().map(OwnedSlot::id_string).collect();
        return Err(IdError::MultipleOwnerEntries {
            claim: claim.name.clone(),
            ids: ids.join(","),
        });
    }
    Ok(owned.pop())
}

/// Fail if the claim resolved into one of its index's reserved spans
pub(crate) fn check_reserved(claim: &IdClaim, parent: Option<&str>) -> IdResult<()> {
    match parent {
        Some(name) if is_reserved_range(&claim.index, name) => Err(IdError::Reserved {
            claim: claim.name.clone(),
            reserved: name.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Collapse parent slots to the distinct range claims they belong to
pub(crate) fn single_range_parent(claim: &IdClaim, parents: &[SlotEntry]) -> IdResult<Option<String>> {
    let mut names = BTreeSet::new();
    for parent in parents {
        if !is_range_slot(parent) {
            return Err(IdError::ParentNotRange {
                claim: claim.name.clone(),
                parent: parent.claim_name().to_string(),
            });
        }
        names.insert(parent.claim_name().to_string());
    }
    if names.len() > 1 {
        return Err(IdError::MultipleParents {
            claim: claim.name.clone(),
            parents: names.into_iter().collect::<Vec<_>>().join(","),
        });
    }
    Ok(names.into_iter().next())
}

pub(crate) fn release_owned(cache: &mut CacheInstance, claim: &IdClaim) -> usize {
    let released = cache.release_matching(&claim.owner_selector());
    if released > 0 {
        debug!(
            target: "idspace-backend",
            "Released {} slot(s) of claim '{}'",
            released,
            claim.name
        );
    }
    released
}

pub(crate) fn claim_in(
    cache: &mut CacheInstance,
    range_name: Option<&str>,
    block: IdBlock,
    claim: &IdClaim,
) -> IdResult<()> {
    cache.table_mut(range_name)?.claim(block, claim.slot_labels())
}
