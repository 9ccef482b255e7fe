// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# idspace-backend

Allocation backend for idspace indexes.

## Architecture

```text
┌──────────────────────────────────────────────────────────────┐
│  IdBackend (create_index / claim / release / delete_index)   │
└──────────────┬───────────────────────────────┬───────────────┘
               ↓                               ↓
┌──────────────────────────────┐  ┌────────────────────────────┐
│  CacheInstance per index     │  │  BackendStorage            │
│  IdTree + RangeTables        │←→│  claims + entries (durable)│
│  mutated by Applicators      │  │  Memory / File adapters    │
└──────────────────────────────┘  └────────────────────────────┘
```

The cache answers every allocation decision; the store is rewritten to
mirror it after each successful mutation and read back only when an index
is (re)created.

## Usage

```rust,ignore
use idspace_backend::{IdBackend, MemoryStorage};
use idspace_structures::{ClaimOwner, IdClaim, IdIndex, IdType};
use std::sync::Arc;

let backend = IdBackend::new(Arc::new(MemoryStorage::new()));
backend.create_index(&IdIndex::new("default", "vlan", IdType::Vlan))?;

let mut claim = IdClaim::new("default", "web", "vlan", owner);
backend.claim(&mut claim)?;
assert_eq!(claim.status.id.as_deref(), Some("0"));
```
*/

pub mod applicator;
mod backend;
pub mod cache;
mod reconcile;
pub mod storage;

pub use applicator::{apply_claim, applicator_for, Applicator};
pub use backend::IdBackend;
pub use cache::{CacheInstance, OwnedSlot};
pub use reconcile::{RestoreReport, SaveReport};
pub use storage::{open_storage, BackendStorage, FileStorage, IndexRecords, MemoryStorage};
