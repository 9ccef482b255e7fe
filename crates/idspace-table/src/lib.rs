// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # idspace-table
//!
//! The two allocation structures an index cache is built from:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  IdTree (whole domain, aligned blocks)       │  ← range claims, main-tree ids
//! └──────────────────────────────────────────────┘
//!           │ one per range claim
//!           ↓
//! ┌──────────────────────────────────────────────┐
//! │  RangeTable [from, to] (single ids)          │  ← ids claimed inside a range
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Both implement [`IdAllocator`], so claim logic can target either without
//! knowing which one it holds.

pub mod range_table;
pub mod tree;

pub use range_table::RangeTable;
pub use tree::IdTree;

use idspace_structures::labels::LABEL_CLAIM_NAME;
use idspace_structures::{IdBlock, IdResult, LabelSelector, Labels};

/// An occupied slot and the labels of its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    pub block: IdBlock,
    pub labels: Labels,
}

impl SlotEntry {
    pub fn new(block: IdBlock, labels: Labels) -> Self {
        Self { block, labels }
    }

    /// Name of the owning claim, empty if the slot is unlabelled
    pub fn claim_name(&self) -> &str {
        self.labels
            .get(LABEL_CLAIM_NAME)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Claim/release capability shared by the tree and range tables
pub trait IdAllocator {
    /// Occupy exactly `block`; fails if any part of it is taken
    fn claim(&mut self, block: IdBlock, labels: Labels) -> IdResult<()>;

    /// Occupy the lowest free single id
    fn claim_free(&mut self, labels: Labels) -> IdResult<SlotEntry>;

    /// Relabel an occupied block
    fn update(&mut self, block: IdBlock, labels: Labels) -> IdResult<()>;

    /// Free a block, returning its labels if it was occupied
    fn release(&mut self, block: IdBlock) -> Option<Labels>;

    fn get(&self, block: IdBlock) -> Option<SlotEntry>;

    fn get_by_label(&self, selector: &LabelSelector) -> Vec<SlotEntry>;

    /// True if no occupied slot covers `id`
    fn is_free(&self, id: u64) -> bool;

    fn get_all(&self) -> Vec<SlotEntry>;

    /// Number of occupied slots
    fn size(&self) -> usize;
}
