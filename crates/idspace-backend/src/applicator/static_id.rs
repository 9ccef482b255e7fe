// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use super::{check_reserved, claim_in, release_owned, reclaim_owned, single_range_parent, Applicator};
use crate::cache::{is_range_slot, CacheInstance};
use idspace_structures::{IdBlock, IdClaim, IdError, IdResult};
use idspace_table::IdAllocator;

/// Claims one caller-chosen id, inside whichever range covers it
pub struct StaticApplicator;

impl StaticApplicator {
    /// Range table the id must live in; `None` is the main tree
    fn resolve_parent(cache: &CacheInstance, claim: &IdClaim, id: u64) -> IdResult<Option<String>> {
        let block = IdBlock::single(id);
        let tree = cache.tree();
        if let Some(existing) = tree.get(block) {
            if is_range_slot(&existing) {
                return Ok(Some(existing.claim_name().to_string()));
            }
            return Err(IdError::AlreadyClaimed {
                id: id.to_string(),
                owner: existing.claim_name().to_string(),
            });
        }
        single_range_parent(claim, &tree.parents(block))
    }
}

impl Applicator for StaticApplicator {
    fn validate(&mut self, _cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()> {
        claim.static_id().map(|_| ())
    }

    fn apply(&mut self, cache: &mut CacheInstance, claim: &mut IdClaim) -> IdResult<()> {
        let id = claim.static_id()?;
        let block = IdBlock::single(id);
        match reclaim_owned(cache, claim, Some(id))? {
            Some(slot) => {
                cache
                    .table_mut(slot.range_name.as_deref())?
                    .update(block, claim.slot_labels())?;
            }
            None => {
                let parent = Self::resolve_parent(cache, claim, id)?;
                check_reserved(claim, parent.as_deref())?;
                claim_in(cache, parent.as_deref(), block, claim)?;
            }
        }
        claim.set_ready_id(id.to_string());
        Ok(())
    }

    fn delete(&mut self, cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()> {
        release_owned(cache, claim);
        Ok(())
    }
}
