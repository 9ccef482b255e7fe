// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bootstrapping a backend from `idspace.toml`, then restarting it

use idspace::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("idspace.toml");
    let content = format!(
        r#"
[storage]
backend = "file"
data_dir = "{}"

[[indexes]]
name = "vlan"
id_type = "vlan"
min_id = 1
max_id = 4094

[[indexes]]
namespace = "fabric"
name = "evi"
id_type = "id32"
"#,
        dir.join("data").display()
    );
    fs::write(&path, content).unwrap();
    path
}

fn owner() -> ClaimOwner {
    ClaimOwner::Internal {
        kind: "Interface".to_string(),
    }
}

/// Configured indexes are created with their reserved bounds
#[test]
fn test_backend_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_config(Some(write_config(temp_dir.path()).as_path()), None).unwrap();
    validate_config(&config).unwrap();

    let backend = IdBackend::from_config(&config).unwrap();
    let vlan = IndexKey::new("default", "vlan");
    let evi = IndexKey::new("fabric", "evi");
    assert_eq!(backend.list_indexes(), vec![vlan.clone(), evi.clone()]);

    // 0 and 4095 are withdrawn by the bounds
    let mut claim = IdClaim::new("default", "eth0", "vlan", owner());
    backend.claim(&mut claim).unwrap();
    assert_eq!(claim.status_id(), Some(1));
    assert_eq!(backend.index_size(&evi).unwrap(), 0);
}

/// A restarted backend sees the same allocations
#[test]
fn test_restart_restores_allocations() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path());
    let vlan = IndexKey::new("default", "vlan");

    let expected = {
        let config = load_config(Some(config_path.as_path()), None).unwrap();
        let backend = IdBackend::from_config(&config).unwrap();
        let mut range = IdClaim::new("default", "tenant-a", "vlan", owner()).with_range("100-199");
        backend.claim(&mut range).unwrap();
        let mut fixed = IdClaim::new("default", "uplink", "vlan", owner()).with_id(200);
        backend.claim(&mut fixed).unwrap();
        let mut entries = backend.list_entries(&vlan).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    };

    let config = load_config(Some(config_path.as_path()), None).unwrap();
    let restarted = IdBackend::from_config(&config).unwrap();
    let mut entries = restarted.list_entries(&vlan).unwrap();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(entries, expected);

    let mut conflicting = IdClaim::new("default", "other", "vlan", owner()).with_id(200);
    let err = restarted.claim(&mut conflicting).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

/// Duplicate index declarations are rejected before startup
#[test]
fn test_duplicate_index_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("idspace.toml");
    fs::write(
        &path,
        r#"
[[indexes]]
name = "vlan"
id_type = "vlan"

[[indexes]]
name = "vlan"
id_type = "vlan"
"#,
    )
    .unwrap();

    let config = load_config(Some(path.as_path()), None).unwrap();
    assert!(validate_config(&config).is_err());
}
