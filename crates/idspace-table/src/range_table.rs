// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounded sub-allocator backing one range claim.

use crate::{IdAllocator, SlotEntry};
use idspace_structures::{IdBlock, IdError, IdRange, IdResult, LabelSelector, Labels};
use std::collections::BTreeMap;

/// Single-id allocator over the inclusive span `[from, to]`
#[derive(Debug, Clone)]
pub struct RangeTable {
    name: String,
    range: IdRange,
    ids: BTreeMap<u64, Labels>,
}

impl RangeTable {
    pub fn new(name: impl Into<String>, range: IdRange) -> Self {
        Self {
            name: name.into(),
            range,
            ids: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> IdRange {
        self.range
    }

    fn single_in_range(&self, block: IdBlock) -> IdResult<u64> {
        if !block.is_single() {
            return Err(IdError::InvalidClaim(format!(
                "range table '{}' only holds single ids, got {}",
                self.name, block
            )));
        }
        if !self.range.contains(block.start()) {
            return Err(IdError::InvalidClaim(format!(
                "id {} is outside range '{}' ({})",
                block.start(),
                self.name,
                self.range
            )));
        }
        Ok(block.start())
    }
}

impl IdAllocator for RangeTable {
    fn claim(&mut self, block: IdBlock, labels: Labels) -> IdResult<()> {
        let id = self.single_in_range(block)?;
        if let Some(existing) = self.get(block) {
            return Err(IdError::AlreadyClaimed {
                id: id.to_string(),
                owner: existing.claim_name().to_string(),
            });
        }
        self.ids.insert(id, labels);
        Ok(())
    }

    fn claim_free(&mut self, labels: Labels) -> IdResult<SlotEntry> {
        let mut next = self.range.from() as u128;
        for id in self.ids.keys() {
            if *id as u128 > next {
                break;
            }
            next = *id as u128 + 1;
        }
        if next > self.range.to() as u128 {
            return Err(IdError::Exhausted(format!("range '{}' ({})", self.name, self.range)));
        }
        let id = next as u64;
        self.ids.insert(id, labels.clone());
        Ok(SlotEntry::new(IdBlock::single(id), labels))
    }

    fn update(&mut self, block: IdBlock, labels: Labels) -> IdResult<()> {
        match self.ids.get_mut(&block.start()).filter(|_| block.is_single()) {
            Some(existing) => {
                *existing = labels;
                Ok(())
            }
            None => Err(IdError::NotFound(format!("{} in range '{}'", block, self.name))),
        }
    }

    fn release(&mut self, block: IdBlock) -> Option<Labels> {
        if !block.is_single() {
            return None;
        }
        self.ids.remove(&block.start())
    }

    fn get(&self, block: IdBlock) -> Option<SlotEntry> {
        if !block.is_single() {
            return None;
        }
        self.ids
            .get(&block.start())
            .map(|labels| SlotEntry::new(block, labels.clone()))
    }

    fn get_by_label(&self, selector: &LabelSelector) -> Vec<SlotEntry> {
        self.ids
            .iter()
            .filter(|(_, labels)| selector.matches(labels))
            .map(|(id, labels)| SlotEntry::new(IdBlock::single(*id), labels.clone()))
            .collect()
    }

    fn is_free(&self, id: u64) -> bool {
        self.range.contains(id) && !self.ids.contains_key(&id)
    }

    fn get_all(&self) -> Vec<SlotEntry> {
        self.ids
            .iter()
            .map(|(id, labels)| SlotEntry::new(IdBlock::single(*id), labels.clone()))
            .collect()
    }

    fn size(&self) -> usize {
        self.ids.len()
    }
}
