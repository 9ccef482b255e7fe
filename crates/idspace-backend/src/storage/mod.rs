// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Durable store for claims and entries.

The backend treats storage as the source of truth across restarts: caches
are rebuilt from it on index creation and mirrored back into it after
every mutation. Two adapters ship with the crate:

- [`MemoryStorage`]: process-local, for tests and ephemeral deployments
- [`FileStorage`]: one JSON document per index under a data directory
*/

mod file;
mod memory;
mod records;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use records::IndexRecords;

use idspace_config::{StorageBackend, StorageConfig};
use idspace_structures::{IdClaim, IdEntry, IdResult, IndexKey};
use std::sync::Arc;
use tracing::info;

/// CRUD over the durable claim and entry records of each index.
///
/// `create_*` fails with `AlreadyExists` when the record is present,
/// `update_*` and `delete_*` fail with `NotFound` when it is absent.
pub trait BackendStorage: Send + Sync {
    fn list_entries(&self, index: &IndexKey) -> IdResult<Vec<IdEntry>>;
    fn create_entry(&self, entry: &IdEntry) -> IdResult<()>;
    fn update_entry(&self, entry: &IdEntry) -> IdResult<()>;
    fn delete_entry(&self, entry: &IdEntry) -> IdResult<()>;

    /// Claims targeting `index`, optionally restricted to one owner kind
    fn list_claims(&self, index: &IndexKey, owner_kind: Option<&str>) -> IdResult<Vec<IdClaim>>;
    fn create_claim(&self, claim: &IdClaim) -> IdResult<()>;
    fn update_claim(&self, claim: &IdClaim) -> IdResult<()>;
    fn delete_claim(&self, claim: &IdClaim) -> IdResult<()>;
}

/// Open the storage adapter selected by configuration
pub fn open_storage(config: &StorageConfig) -> IdResult<Arc<dyn BackendStorage>> {
    match config.backend {
        StorageBackend::Memory => {
            info!(target: "idspace-backend", "Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::File => {
            info!(
                target: "idspace-backend",
                "Using file storage at {}",
                config.data_dir.display()
            );
            Ok(Arc::new(FileStorage::open(&config.data_dir)?))
        }
    }
}
