// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use super::{check_reserved, release_owned, reclaim_owned, single_range_parent, Applicator};
use crate::cache::CacheInstance;
use idspace_structures::{IdBlock, IdClaim, IdError, IdResult, LabelSelector};
use idspace_table::IdAllocator;

/// Picks a free id, from the main tree or from the range its selector names.
///
/// A claim that already owns an id keeps it; a claim whose previous id was
/// lost gets that id back when it is still free.
pub struct DynamicApplicator;

impl DynamicApplicator {
    fn resolve_parent(
        cache: &CacheInstance,
        claim: &IdClaim,
        selector: &LabelSelector,
    ) -> IdResult<String> {
        let matches = cache.tree().get_by_label(selector);
        match single_range_parent(claim, &matches)? {
            Some(name) => Ok(name),
            None => Err(IdError::NoParent {
                claim: claim.name.clone(),
                selector: selector.to_string(),
            }),
        }
    }
}

impl Applicator for DynamicApplicator {
    fn validate(&mut self, _cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()> {
        match &claim.selector {
            Some(selector) => selector.validate(),
            None => Ok(()),
        }
    }

    fn apply(&mut self, cache: &mut CacheInstance, claim: &mut IdClaim) -> IdResult<()> {
        let previous = claim.status_id();
        let id = match reclaim_owned(cache, claim, previous)? {
            Some(slot) => {
                cache
                    .table_mut(slot.range_name.as_deref())?
                    .update(slot.entry.block, claim.slot_labels())?;
                slot.entry.block.start()
            }
            None => {
                let parent = match &claim.selector {
                    Some(selector) if !selector.is_empty() => {
                        Some(Self::resolve_parent(cache, claim, selector)?)
                    }
                    _ => None,
                };
                check_reserved(claim, parent.as_deref())?;
                let labels = claim.slot_labels();
                let table = cache.table_mut(parent.as_deref())?;
                match previous.filter(|id| table.is_free(*id)) {
                    Some(id) => {
                        table.claim(IdBlock::single(id), labels)?;
                        id
                    }
                    None => table.claim_free(labels)?.block.start(),
                }
            }
        };
        claim.set_ready_id(id.to_string());
        Ok(())
    }

    fn delete(&mut self, cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()> {
        release_owned(cache, claim);
        Ok(())
    }
}
