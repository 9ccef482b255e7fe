// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Whole-domain allocation tree.
//!
//! Stores non-overlapping aligned blocks. A block's parents are the stored
//! blocks strictly containing it, its children the stored blocks strictly
//! inside it. Range claims occupy blocks wider than one id, so these
//! relations are how overlaps between ranges and single ids are detected.

use crate::{IdAllocator, SlotEntry};
use idspace_structures::{IdBlock, IdError, IdResult, IdType, LabelSelector, Labels};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct IdTree {
    id_type: IdType,
    blocks: BTreeMap<IdBlock, Labels>,
}

impl IdTree {
    pub fn new(id_type: IdType) -> Self {
        Self {
            id_type,
            blocks: BTreeMap::new(),
        }
    }

    pub fn id_type(&self) -> IdType {
        self.id_type
    }

    /// Stored blocks strictly containing `block`, widest first
    pub fn parents(&self, block: IdBlock) -> Vec<SlotEntry> {
        let bits = self.id_type.bits();
        (block.size_bits() + 1..=bits)
            .rev()
            .map(|size_bits| IdBlock::containing(block.start(), size_bits))
            .filter_map(|parent| self.get(parent))
            .collect()
    }

    /// Stored blocks strictly inside `block`, in id order
    pub fn children(&self, block: IdBlock) -> Vec<SlotEntry> {
        if block.is_single() {
            return Vec::new();
        }
        let lower = IdBlock::single(block.start());
        self.blocks
            .range(lower..)
            .take_while(|(b, _)| b.start() <= block.end())
            .filter(|(b, _)| block.strictly_contains(b))
            .map(|(b, labels)| SlotEntry::new(*b, labels.clone()))
            .collect()
    }

    fn check_in_domain(&self, block: IdBlock) -> IdResult<()> {
        if block.end() > self.id_type.max() || block.size_bits() > self.id_type.bits() {
            return Err(IdError::InvalidClaim(format!(
                "{} is outside the {} domain",
                block, self.id_type
            )));
        }
        Ok(())
    }

    fn occupant(&self, block: IdBlock) -> Option<SlotEntry> {
        self.get(block)
            .or_else(|| self.parents(block).into_iter().next())
            .or_else(|| self.children(block).into_iter().next())
    }
}

impl IdAllocator for IdTree {
    fn claim(&mut self, block: IdBlock, labels: Labels) -> IdResult<()> {
        self.check_in_domain(block)?;
        if let Some(existing) = self.occupant(block) {
            return Err(IdError::AlreadyClaimed {
                id: block.to_string(),
                owner: existing.claim_name().to_string(),
            });
        }
        trace!(block = %block, "tree claim");
        self.blocks.insert(block, labels);
        Ok(())
    }

    fn claim_free(&mut self, labels: Labels) -> IdResult<SlotEntry> {
        // blocks are disjoint and sorted by start, so the first gap is the answer
        let mut next: u128 = 0;
        for block in self.blocks.keys() {
            if block.start() as u128 > next {
                break;
            }
            next = next.max(block.end() as u128 + 1);
        }
        if next > self.id_type.max() as u128 {
            return Err(IdError::Exhausted(format!("{} tree", self.id_type)));
        }
        let block = IdBlock::single(next as u64);
        self.blocks.insert(block, labels.clone());
        Ok(SlotEntry::new(block, labels))
    }

    fn update(&mut self, block: IdBlock, labels: Labels) -> IdResult<()> {
        match self.blocks.get_mut(&block) {
            Some(existing) => {
                *existing = labels;
                Ok(())
            }
            None => Err(IdError::NotFound(format!("{} in {} tree", block, self.id_type))),
        }
    }

    fn release(&mut self, block: IdBlock) -> Option<Labels> {
        self.blocks.remove(&block)
    }

    fn get(&self, block: IdBlock) -> Option<SlotEntry> {
        self.blocks
            .get(&block)
            .map(|labels| SlotEntry::new(block, labels.clone()))
    }

    fn get_by_label(&self, selector: &LabelSelector) -> Vec<SlotEntry> {
        self.blocks
            .iter()
            .filter(|(_, labels)| selector.matches(labels))
            .map(|(b, labels)| SlotEntry::new(*b, labels.clone()))
            .collect()
    }

    fn is_free(&self, id: u64) -> bool {
        self.id_type.contains(id) && self.occupant(IdBlock::single(id)).is_none()
    }

    fn get_all(&self) -> Vec<SlotEntry> {
        self.blocks
            .iter()
            .map(|(b, labels)| SlotEntry::new(*b, labels.clone()))
            .collect()
    }

    fn size(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idspace_structures::labels::LABEL_CLAIM_NAME;
    use idspace_structures::IdRange;
    use proptest::prelude::*;

    fn owned(name: &str) -> Labels {
        let mut labels = Labels::new();
        labels.insert(LABEL_CLAIM_NAME.to_string(), name.to_string());
        labels
    }

    fn claim_range(tree: &mut IdTree, range: &str, name: &str) {
        let range: IdRange = range.parse().unwrap();
        for block in range.blocks() {
            tree.claim(block, owned(name)).unwrap();
        }
    }

    #[test]
    fn test_claim_free_starts_at_zero() {
        let mut tree = IdTree::new(IdType::Id16);
        assert_eq!(tree.claim_free(owned("a")).unwrap().block, IdBlock::single(0));
        assert_eq!(tree.claim_free(owned("b")).unwrap().block, IdBlock::single(1));
        assert_eq!(tree.size(), 2);
    }

    #[test]
    fn test_claim_free_skips_blocks() {
        let mut tree = IdTree::new(IdType::Id16);
        claim_range(&mut tree, "0-9", "reserved");
        let entry = tree.claim_free(owned("a")).unwrap();
        assert_eq!(entry.block, IdBlock::single(10));
    }

    #[test]
    fn test_claim_conflicts() {
        let mut tree = IdTree::new(IdType::Id16);
        tree.claim(IdBlock::single(5), owned("a")).unwrap();
        let err = tree.claim(IdBlock::single(5), owned("b")).unwrap_err();
        assert_eq!(
            err,
            IdError::AlreadyClaimed { id: "5".into(), owner: "a".into() }
        );
        // 4-7 would swallow the single id 5
        assert!(tree.claim(IdBlock::new(4, 2).unwrap(), owned("r")).is_err());
    }

    #[test]
    fn test_parents_and_children() {
        let mut tree = IdTree::new(IdType::Id16);
        claim_range(&mut tree, "16-31", "r");
        let parents = tree.parents(IdBlock::single(20));
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].claim_name(), "r");
        assert!(tree.get(IdBlock::single(20)).is_none());
        assert!(!tree.is_free(20));
        assert!(tree.is_free(32));

        let children = tree.children(IdBlock::new(0, 6).unwrap());
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].block, IdBlock::new(16, 4).unwrap());
    }

    #[test]
    fn test_out_of_domain_rejected() {
        let mut tree = IdTree::new(IdType::Vlan);
        assert!(tree.claim(IdBlock::single(4096), owned("a")).is_err());
        assert!(!tree.is_free(4096));
    }

    #[test]
    fn test_exhaustion() {
        let mut tree = IdTree::new(IdType::Vlan);
        claim_range(&mut tree, "0-4095", "all");
        assert!(matches!(tree.claim_free(owned("a")), Err(IdError::Exhausted(_))));
    }

    #[test]
    fn test_full_64bit_reservation() {
        let mut tree = IdTree::new(IdType::Id64);
        claim_range(&mut tree, "1001-18446744073709551615", "max");
        assert!(tree.size() < 128);
        assert!(!tree.is_free(u64::MAX));
        assert!(tree.is_free(1000));
    }

    #[test]
    fn test_update_and_release() {
        let mut tree = IdTree::new(IdType::Id16);
        tree.claim(IdBlock::single(3), owned("a")).unwrap();
        tree.update(IdBlock::single(3), owned("b")).unwrap();
        assert_eq!(tree.get(IdBlock::single(3)).unwrap().claim_name(), "b");
        assert!(tree.update(IdBlock::single(4), owned("b")).is_err());
        assert_eq!(tree.release(IdBlock::single(3)), Some(owned("b")));
        assert!(tree.release(IdBlock::single(3)).is_none());
    }

    proptest! {
        #[test]
        fn prop_claimed_blocks_never_overlap(ops in proptest::collection::vec((0u64..256, 0u64..32), 1..40)) {
            let mut tree = IdTree::new(IdType::Id16);
            for (i, (from, span)) in ops.into_iter().enumerate() {
                let range = IdRange::new(from, from + span).unwrap();
                let name = format!("c{}", i);
                let blocks = range.blocks();
                let ok = blocks.iter().all(|b| tree.occupant(*b).is_none());
                if ok {
                    for b in blocks {
                        tree.claim(b, owned(&name)).unwrap();
                    }
                }
            }
            let all = tree.get_all();
            for pair in all.windows(2) {
                prop_assert!(pair[0].block.end() < pair[1].block.start());
            }
        }
    }
}
