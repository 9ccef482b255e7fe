// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # idspace - identifier allocation control plane
//!
//! Hands out non-overlapping identifiers (VLAN ids, ESIs, EVIs, generic
//! 16/32/64-bit ids) from named indexes. Claims ask for a specific id, any
//! free id, or a whole range that later claims can allocate inside. Every
//! allocation is mirrored to durable storage and replayed on restart.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use idspace::prelude::*;
//!
//! let backend = IdBackend::new(Arc::new(MemoryStorage::new()));
//! let index = IdIndex::new("default", "vlan", IdType::Vlan);
//! backend.create_index(&index).unwrap();
//!
//! let owner = ClaimOwner::Internal { kind: "Interface".to_string() };
//! let mut claim = IdClaim::new("default", "eth0", "vlan", owner);
//! backend.claim(&mut claim).unwrap();
//! assert_eq!(claim.status_id(), Some(0));
//! ```
//!
//! ## Crates
//! - [`structures`]: domains, blocks, labels, indexes, claims and entries
//! - [`table`]: the allocation tree and range tables
//! - [`backend`]: per-index caches, applicators, storage and reconciliation
//! - [`config`]: TOML configuration with environment and CLI overrides
//! - [`observability`]: logging setup for binaries

pub use idspace_backend as backend;
pub use idspace_config as config;
pub use idspace_observability as observability;
pub use idspace_structures as structures;
pub use idspace_table as table;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use idspace_backend::{
        BackendStorage, FileStorage, IdBackend, MemoryStorage, RestoreReport, SaveReport,
    };
    pub use idspace_config::{load_config, validate_config, IdspaceConfig};
    pub use idspace_structures::{
        ClaimOwner, ClaimType, ErrorKind, IdBlock, IdClaim, IdEntry, IdError, IdIndex, IdRange,
        IdResult, IdType, IndexKey, LabelSelector, Labels,
    };
}
