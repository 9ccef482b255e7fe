// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every problem in one pass so a bad file reports all of its
//! errors at once.

use crate::{ConfigError, ConfigResult, IdspaceConfig, StorageBackend};
use std::collections::HashSet;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    DuplicateIndex { key: String },
    InvalidIndex { key: String, reason: String },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateIndex { key } => write!(f, "Index {} is declared more than once", key),
            Self::InvalidIndex { key, reason } => write!(f, "Index {}: {}", key, reason),
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Unique, well-formed index declarations (bounds inside the id type)
/// - A data directory when file storage is selected
/// - Known log level and sane retention settings
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failure
pub fn validate_config(config: &IdspaceConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_indexes(config, &mut errors);
    validate_storage(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }
    Ok(())
}

fn validate_indexes(config: &IdspaceConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut seen = HashSet::new();
    for index_config in &config.indexes {
        let index = index_config.to_index();
        let key = index.key().to_string();
        if !seen.insert(key.clone()) {
            errors.push(ConfigValidationError::DuplicateIndex { key });
            continue;
        }
        if let Err(err) = index.validate() {
            errors.push(ConfigValidationError::InvalidIndex {
                key,
                reason: err.to_string(),
            });
        }
    }
}

fn validate_storage(config: &IdspaceConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.storage.backend == StorageBackend::File
        && config.storage.data_dir.as_os_str().is_empty()
    {
        errors.push(ConfigValidationError::MissingRequired {
            field: "storage.data_dir".to_string(),
        });
    }
}

fn validate_logging(config: &IdspaceConfig, errors: &mut Vec<ConfigValidationError>) {
    if !LOG_LEVELS.contains(&config.system.log_level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.log_level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.system.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }
    if config.logging.file_logging && config.logging.retention_runs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.retention_runs".to_string(),
            reason: "must keep at least one run".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexConfig;
    use idspace_structures::IdType;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&IdspaceConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_index() {
        let mut config = IdspaceConfig::default();
        config.indexes.push(IndexConfig::new("vlan", IdType::Vlan));
        config.indexes.push(IndexConfig::new("vlan", IdType::Id16));

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("default/vlan"));
    }

    #[test]
    fn test_index_bounds_outside_type() {
        let mut config = IdspaceConfig::default();
        let mut index = IndexConfig::new("vlan", IdType::Vlan);
        index.max_id = Some(5000);
        config.indexes.push(index);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_storage_needs_data_dir() {
        let mut config = IdspaceConfig::default();
        config.storage.backend = StorageBackend::File;
        config.storage.data_dir = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = IdspaceConfig::default();
        config.system.log_level = "loud".to_string();
        config.logging.file_logging = true;
        config.logging.retention_runs = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("system.log_level"));
        assert!(err.contains("logging.retention_runs"));
    }
}
