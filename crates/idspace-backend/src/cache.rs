// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory allocation state of one index.

use idspace_structures::labels::LABEL_CLAIM_TYPE;
use idspace_structures::{ClaimType, IdEntry, IdError, IdRange, IdResult, IdType, IndexKey, LabelSelector};
use idspace_table::{IdAllocator, IdTree, RangeTable, SlotEntry};
use std::collections::BTreeMap;

/// A slot together with the table it lives in (`None` = main tree)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedSlot {
    pub range_name: Option<String>,
    pub entry: SlotEntry,
}

impl OwnedSlot {
    pub fn id_string(&self) -> String {
        self.entry.block.to_string()
    }
}

/// Main tree plus one range table per ready range claim
#[derive(Debug, Clone)]
pub struct CacheInstance {
    id_type: IdType,
    tree: IdTree,
    ranges: BTreeMap<String, RangeTable>,
    initialized: bool,
}

impl CacheInstance {
    pub fn new(id_type: IdType) -> Self {
        Self {
            id_type,
            tree: IdTree::new(id_type),
            ranges: BTreeMap::new(),
            initialized: false,
        }
    }

    pub fn id_type(&self) -> IdType {
        self.id_type
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn set_initialized(&mut self) {
        self.initialized = true;
    }

    /// Occupied slots across the tree and every range table
    pub fn size(&self) -> usize {
        self.tree.size() + self.ranges.values().map(|t| t.size()).sum::<usize>()
    }

    pub fn tree(&self) -> &IdTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut IdTree {
        &mut self.tree
    }

    pub fn range_table(&self, name: &str) -> Option<&RangeTable> {
        self.ranges.get(name)
    }

    pub fn range_names(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    pub(crate) fn insert_range_table(&mut self, name: &str, range: IdRange) {
        self.ranges
            .insert(name.to_string(), RangeTable::new(name, range));
    }

    pub(crate) fn remove_range_table(&mut self, name: &str) -> Option<RangeTable> {
        self.ranges.remove(name)
    }

    /// The main tree for `None`, else the named range table
    pub fn table(&self, range_name: Option<&str>) -> IdResult<&dyn IdAllocator> {
        match range_name {
            None => Ok(&self.tree),
            Some(name) => self
                .ranges
                .get(name)
                .map(|t| t as &dyn IdAllocator)
                .ok_or_else(|| IdError::RangeTableNotFound(name.to_string())),
        }
    }

    pub(crate) fn table_mut(&mut self, range_name: Option<&str>) -> IdResult<&mut dyn IdAllocator> {
        match range_name {
            None => Ok(&mut self.tree),
            Some(name) => self
                .ranges
                .get_mut(name)
                .map(|t| t as &mut dyn IdAllocator)
                .ok_or_else(|| IdError::RangeTableNotFound(name.to_string())),
        }
    }

    /// Every slot matching `selector`, main tree first then tables by name
    pub fn slots_matching(&self, selector: &LabelSelector) -> Vec<OwnedSlot> {
        let tree = self.tree.get_by_label(selector).into_iter().map(|entry| OwnedSlot {
            range_name: None,
            entry,
        });
        let tables = self.ranges.iter().flat_map(|(name, table)| {
            table
                .get_by_label(selector)
                .into_iter()
                .map(move |entry| OwnedSlot {
                    range_name: Some(name.clone()),
                    entry,
                })
        });
        tree.chain(tables).collect()
    }

    pub(crate) fn release_slot(&mut self, slot: &OwnedSlot) {
        if let Ok(table) = self.table_mut(slot.range_name.as_deref()) {
            table.release(slot.entry.block);
        }
    }

    /// Release every slot matching `selector`; returns how many were freed
    pub(crate) fn release_matching(&mut self, selector: &LabelSelector) -> usize {
        let slots = self.slots_matching(selector);
        for slot in &slots {
            self.release_slot(slot);
        }
        slots.len()
    }

    /// Entry images of every occupied slot
    pub fn materialize(&self, index: &IndexKey) -> IdResult<Vec<IdEntry>> {
        let mut entries = Vec::with_capacity(self.size());
        for slot in self.tree.get_all() {
            entries.push(IdEntry::from_slot(
                index,
                None,
                &slot.block.to_string(),
                &slot.labels,
            )?);
        }
        for (name, table) in &self.ranges {
            for slot in table.get_all() {
                entries.push(IdEntry::from_slot(
                    index,
                    Some(name),
                    &slot.block.to_string(),
                    &slot.labels,
                )?);
            }
        }
        Ok(entries)
    }
}

/// True if the slot belongs to a range claim
pub(crate) fn is_range_slot(slot: &SlotEntry) -> bool {
    slot.label(LABEL_CLAIM_TYPE) == Some(ClaimType::Range.as_str())
}
