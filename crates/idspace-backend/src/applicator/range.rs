// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use super::{release_owned, Applicator};
use crate::cache::CacheInstance;
use idspace_structures::{IdBlock, IdClaim, IdError, IdRange, IdResult};
use idspace_table::IdAllocator;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Reserves a contiguous span in the main tree and backs it with a range table.
///
/// A span change tears the old allocation down (table included) and claims
/// the new one from scratch; a relabel keeps the table and its children.
#[derive(Debug, Default)]
pub struct RangeApplicator {
    range_exists: bool,
}

impl RangeApplicator {
    fn check_overlap(cache: &CacheInstance, range: IdRange, block: IdBlock) -> IdResult<()> {
        let tree = cache.tree();
        let conflict = tree
            .get(block)
            .map(|e| ("held", e))
            .or_else(|| tree.children(block).into_iter().next().map(|e| ("child", e)))
            .or_else(|| tree.parents(block).into_iter().next().map(|e| ("parent", e)));
        match conflict {
            Some((relation, slot)) => Err(IdError::Overlap {
                range: range.to_string(),
                detail: format!("{} {} of '{}'", relation, slot.block, slot.claim_name()),
            }),
            None => Ok(()),
        }
    }
}

impl Applicator for RangeApplicator {
    fn validate(&mut self, cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()> {
        let range = claim.requested_range()?;
        let wanted: BTreeSet<IdBlock> = range.blocks().into_iter().collect();
        let owned = cache.slots_matching(&claim.owner_selector());
        let held: BTreeSet<IdBlock> = owned
            .iter()
            .filter(|s| s.range_name.is_none())
            .map(|s| s.entry.block)
            .collect();

        self.range_exists = !held.is_empty() && held == wanted && held.len() == owned.len();
        if self.range_exists {
            return Ok(());
        }

        if !owned.is_empty() || cache.range_table(&claim.name).is_some() {
            info!(
                target: "idspace-backend",
                "Range claim '{}' changed to {}, releasing previous allocation",
                claim.name,
                range
            );
            release_owned(cache, claim);
            cache.remove_range_table(&claim.name);
        }
        for block in &wanted {
            Self::check_overlap(cache, range, *block)?;
        }
        Ok(())
    }

    fn apply(&mut self, cache: &mut CacheInstance, claim: &mut IdClaim) -> IdResult<()> {
        let range = claim.requested_range()?;
        let labels = claim.slot_labels();
        for block in range.blocks() {
            if self.range_exists {
                cache.tree_mut().update(block, labels.clone())?;
            } else {
                cache.tree_mut().claim(block, labels.clone())?;
            }
        }
        if cache.range_table(&claim.name).is_none() {
            debug!(target: "idspace-backend", "Creating range table '{}' ({})", claim.name, range);
            cache.insert_range_table(&claim.name, range);
        }
        claim.set_ready_range(range.to_string());
        Ok(())
    }

    fn delete(&mut self, cache: &mut CacheInstance, claim: &IdClaim) -> IdResult<()> {
        release_owned(cache, claim);
        if let Some(table) = cache.remove_range_table(&claim.name) {
            debug!(
                target: "idspace-backend",
                "Removed range table '{}' with {} id(s)",
                claim.name,
                table.size()
            );
        }
        Ok(())
    }
}
