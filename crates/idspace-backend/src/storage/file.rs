// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! JSON file storage: `<data_dir>/<namespace>/<index>.json` per index.

use super::{BackendStorage, IndexRecords};
use idspace_structures::{IdClaim, IdEntry, IdError, IdResult, IndexKey};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileStorage {
    base_path: PathBuf,
    // serializes read-modify-write cycles on index documents
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory
    pub fn open<P: AsRef<Path>>(base_path: P) -> IdResult<Self> {
        let path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(|e| {
            IdError::Storage(format!("Failed to create {}: {}", path.display(), e))
        })?;
        Ok(Self {
            base_path: path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn index_path(&self, index: &IndexKey) -> IdResult<PathBuf> {
        for part in [&index.namespace, &index.name] {
            let safe = !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
                && part != "."
                && part != "..";
            if !safe {
                return Err(IdError::Storage(format!(
                    "'{}' cannot be used as a storage path component",
                    part
                )));
            }
        }
        Ok(self
            .base_path
            .join(&index.namespace)
            .join(format!("{}.json", index.name)))
    }

    fn load(&self, index: &IndexKey) -> IdResult<IndexRecords> {
        let path = self.index_path(index)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IndexRecords::default()),
            Err(e) => Err(IdError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn store(&self, index: &IndexKey, records: &IndexRecords) -> IdResult<()> {
        let path = self.index_path(index)?;
        if records.is_empty() {
            return match std::fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // write-then-rename so a crash never leaves a truncated document
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
        std::fs::rename(&tmp, &path)?;
        debug!(
            target: "idspace-backend",
            "Stored {} claims, {} entries to {}",
            records.claims.len(),
            records.entries.len(),
            path.display()
        );
        Ok(())
    }

    fn modify<T>(
        &self,
        index: &IndexKey,
        f: impl FnOnce(&mut IndexRecords) -> IdResult<T>,
    ) -> IdResult<T> {
        let _guard = self.write_lock.lock();
        let mut records = self.load(index)?;
        let result = f(&mut records)?;
        self.store(index, &records)?;
        Ok(result)
    }
}

impl BackendStorage for FileStorage {
    fn list_entries(&self, index: &IndexKey) -> IdResult<Vec<IdEntry>> {
        Ok(self.load(index)?.entries())
    }

    fn create_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.modify(&entry.index_key(), |r| r.create_entry(entry))
    }

    fn update_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.modify(&entry.index_key(), |r| r.update_entry(entry))
    }

    fn delete_entry(&self, entry: &IdEntry) -> IdResult<()> {
        self.modify(&entry.index_key(), |r| r.delete_entry(entry))
    }

    fn list_claims(&self, index: &IndexKey, owner_kind: Option<&str>) -> IdResult<Vec<IdClaim>> {
        Ok(self.load(index)?.claims(owner_kind))
    }

    fn create_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.modify(&claim.index_key(), |r| r.create_claim(claim))
    }

    fn update_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.modify(&claim.index_key(), |r| r.update_claim(claim))
    }

    fn delete_claim(&self, claim: &IdClaim) -> IdResult<()> {
        self.modify(&claim.index_key(), |r| r.delete_claim(claim))
    }
}
