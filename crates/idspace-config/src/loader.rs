// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, IdspaceConfig, StorageBackend};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "idspace.toml";

/// Find the idspace configuration file
///
/// Search order:
/// 1. `IDSPACE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./idspace.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("IDSPACE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by IDSPACE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet IDSPACE_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<IdspaceConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: IdspaceConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `IDSPACE_LOG_LEVEL` -> `system.log_level`
/// - `IDSPACE_STORAGE_BACKEND` -> `storage.backend`
/// - `IDSPACE_DATA_DIR` -> `storage.data_dir`
/// - `IDSPACE_LOG_DIR` -> `logging.log_dir`
///
/// Unparseable values are ignored.
pub fn apply_environment_overrides(config: &mut IdspaceConfig) {
    if let Ok(value) = env::var("IDSPACE_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("IDSPACE_STORAGE_BACKEND") {
        if let Ok(backend) = value.parse::<StorageBackend>() {
            config.storage.backend = backend;
        }
    }
    if let Ok(value) = env::var("IDSPACE_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("IDSPACE_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"storage_backend": "file", "log_level": "debug"}`)
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for a value that does not parse
pub fn apply_cli_overrides(
    config: &mut IdspaceConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("debug") {
        config.system.debug = value.to_lowercase() == "true" || value == "1";
    }
    if let Some(value) = cli_args.get("storage_backend") {
        config.storage.backend = value.parse().map_err(ConfigError::InvalidValue)?;
    }
    if let Some(value) = cli_args.get("data_dir") {
        config.storage.data_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("file_logging") {
        config.logging.file_logging = value.to_lowercase() == "true" || value == "1";
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idspace_structures::IdType;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var("IDSPACE_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("IDSPACE_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_load_config_with_indexes() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("IDSPACE_STORAGE_BACKEND");
        env::remove_var("IDSPACE_DATA_DIR");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("idspace.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[storage]").unwrap();
        writeln!(file, "backend = \"file\"").unwrap();
        writeln!(file, "data_dir = \"/var/lib/idspace\"").unwrap();
        writeln!(file, "[[indexes]]").unwrap();
        writeln!(file, "name = \"vlan\"").unwrap();
        writeln!(file, "id_type = \"vlan\"").unwrap();
        writeln!(file, "min_id = 2").unwrap();
        writeln!(file, "[[indexes]]").unwrap();
        writeln!(file, "namespace = \"fabric\"").unwrap();
        writeln!(file, "name = \"esi\"").unwrap();
        writeln!(file, "id_type = \"esi\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/idspace"));
        assert_eq!(config.indexes.len(), 2);
        assert_eq!(config.indexes[0].namespace, "default");
        assert_eq!(config.indexes[0].id_type, IdType::Vlan);
        assert_eq!(config.indexes[0].min_id, Some(2));
        assert_eq!(config.indexes[1].namespace, "fabric");
        assert_eq!(config.system.log_level, "info");
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("idspace.toml");
        fs::write(&config_path, "[[indexes]]\nname = \"x\"\nid_type = \"id128\"\n").unwrap();
        assert!(matches!(
            load_config(Some(&config_path), None),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = IdspaceConfig::default();

        env::set_var("IDSPACE_STORAGE_BACKEND", "file");
        env::set_var("IDSPACE_DATA_DIR", "/tmp/idspace-env");
        env::set_var("IDSPACE_LOG_LEVEL", "debug");

        apply_environment_overrides(&mut config);

        env::remove_var("IDSPACE_STORAGE_BACKEND");
        env::remove_var("IDSPACE_DATA_DIR");
        env::remove_var("IDSPACE_LOG_LEVEL");

        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/idspace-env"));
        assert_eq!(config.system.log_level, "debug");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = IdspaceConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("storage_backend".to_string(), "file".to_string());
        cli_args.insert("file_logging".to_string(), "true".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.storage.backend, StorageBackend::File);
        assert!(config.logging.file_logging);

        cli_args.insert("storage_backend".to_string(), "etcd".to_string());
        assert!(matches!(
            apply_cli_overrides(&mut config, &cli_args),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("idspace.toml");

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[system]").unwrap();
        writeln!(file, "log_level = \"warn\"").unwrap();
        writeln!(file, "[storage]").unwrap();
        writeln!(file, "data_dir = \"file-dir\"").unwrap();

        env::set_var("IDSPACE_LOG_LEVEL", "debug");
        env::set_var("IDSPACE_DATA_DIR", "env-dir");

        let mut cli_args = HashMap::new();
        cli_args.insert("data_dir".to_string(), "cli-dir".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("IDSPACE_LOG_LEVEL");
        env::remove_var("IDSPACE_DATA_DIR");

        // CLI wins for data_dir, env wins for log level (no CLI override)
        assert_eq!(config.storage.data_dir, PathBuf::from("cli-dir"));
        assert_eq!(config.system.log_level, "debug");
    }
}
