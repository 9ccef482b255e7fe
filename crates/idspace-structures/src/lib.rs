// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The core crate for idspace. Defines the data types shared by the
//! allocation tables, the backend and its storage adapters:
//!
//! - [`IdType`], [`IdBlock`], [`IdRange`]: numeric domains and id spans
//! - [`Labels`], [`LabelSelector`]: slot ownership metadata and queries
//! - [`IdIndex`], [`IdClaim`], [`IdEntry`]: the index / claim / entry records
//! - [`IdError`]: the error type used across the workspace

mod error;

pub mod claim;
pub mod entry;
pub mod id;
pub mod index;
pub mod labels;

pub use claim::{
    ClaimOwner, ClaimStatus, ClaimType, Condition, ConditionReason, IdClaim, ObjectReference,
};
pub use entry::IdEntry;
pub use error::{ErrorKind, IdError, IdResult};
pub use id::{parse_id, IdBlock, IdRange, IdType};
pub use index::{
    is_reserved_range, reserved_max_name, reserved_min_name, IdIndex, IndexKey, INDEX_OWNER_KIND,
};
pub use labels::{LabelSelector, LabelSelectorRequirement, Labels, SelectorOperator};
