// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `idspace.toml`; `[[indexes]]` tables
//! declare the indexes created at startup.

use idspace_structures::{IdIndex, IdType};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IdspaceConfig {
    pub system: SystemConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub indexes: Vec<IndexConfig>,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub debug: bool,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

/// Durable claim/entry storage
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory of the file backend
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub console: bool,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console: true,
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

/// An index created at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    pub id_type: IdType,
    #[serde(default)]
    pub min_id: Option<u64>,
    #[serde(default)]
    pub max_id: Option<u64>,
    /// Stable owner uid of the index's reserved claims; derived from the key when unset
    #[serde(default)]
    pub uid: Option<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl IndexConfig {
    pub fn new(name: impl Into<String>, id_type: IdType) -> Self {
        Self {
            namespace: default_namespace(),
            name: name.into(),
            id_type,
            min_id: None,
            max_id: None,
            uid: None,
        }
    }

    /// The configured uid, or a name-based uuid that is identical across restarts
    pub fn uid(&self) -> String {
        self.uid.clone().unwrap_or_else(|| {
            let key = format!("{}/{}", self.namespace, self.name);
            uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
        })
    }

    pub fn to_index(&self) -> IdIndex {
        IdIndex::new(self.namespace.clone(), self.name.clone(), self.id_type)
            .with_bounds(self.min_id, self.max_id)
            .with_uid(self.uid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_uid_is_stable() {
        let index = IndexConfig::new("vlan", IdType::Vlan);
        assert_eq!(index.uid(), IndexConfig::new("vlan", IdType::Vlan).uid());
        assert_ne!(index.uid(), IndexConfig::new("esi", IdType::Esi).uid());

        let pinned = IndexConfig {
            uid: Some("fixed".to_string()),
            ..index
        };
        assert_eq!(pinned.to_index().uid, "fixed");
    }

    #[test]
    fn test_to_index_carries_bounds() {
        let mut config = IndexConfig::new("vlan", IdType::Vlan);
        config.min_id = Some(2);
        config.max_id = Some(4094);
        let index = config.to_index();
        assert_eq!(index.min_id, Some(2));
        assert_eq!(index.max_id, Some(4094));
        assert_eq!(index.namespace, "default");
    }
}
