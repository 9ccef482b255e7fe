// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Index Inspection Tool

Loads `idspace.toml`, creates every configured index against the configured
storage (which replays persisted claims), and prints what each index holds.

Usage:
  cargo run --bin idspace_inspect -- [--config idspace.toml] [--entries] [--debug-idspace-backend]

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

use idspace::backend::IdBackend;
use idspace::config::{load_config, validate_config, IdspaceConfig};
use idspace::observability::{debug_flags_help, parse_debug_flags, CrateDebugFlags, LoggingGuard};

/// Inspect idspace indexes restored from durable storage
#[derive(Parser, Debug)]
#[command(name = "idspace_inspect", version, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Path to idspace.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage backend override ("memory" or "file")
    #[arg(long)]
    storage_backend: Option<String>,

    /// Data directory override for the file backend
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level override
    #[arg(long)]
    log_level: Option<String>,

    /// Print every entry, not only index sizes
    #[arg(short, long, default_value_t = false)]
    entries: bool,
}

impl Args {
    fn cli_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        for (key, value) in [
            ("storage_backend", &self.storage_backend),
            ("data_dir", &self.data_dir),
            ("log_level", &self.log_level),
        ] {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value.clone());
            }
        }
        overrides
    }
}

#[cfg(feature = "file-logging")]
fn init_logging(config: &IdspaceConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    if config.logging.file_logging {
        return idspace::observability::init_logging(
            debug_flags,
            &config.system.log_level,
            config.logging.console,
            &config.logging.log_dir,
            config.logging.retention_days,
            config.logging.retention_runs,
        );
    }
    idspace::observability::init_console_logging(debug_flags, &config.system.log_level)
}

#[cfg(not(feature = "file-logging"))]
fn init_logging(config: &IdspaceConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    idspace::observability::init_console_logging(debug_flags, &config.system.log_level)
}

fn main() -> Result<()> {
    // --debug-* flags are handled by CrateDebugFlags, not clap
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(std::env::args().filter(|a| !a.starts_with("--debug-")));

    let config = load_config(args.config.as_deref(), Some(&args.cli_overrides()))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;

    let _guard = init_logging(&config, &debug_flags)?;
    info!(
        target: "idspace",
        backend = ?config.storage.backend,
        indexes = config.indexes.len(),
        "idspace_inspect {}",
        idspace::VERSION
    );

    let backend = IdBackend::from_config(&config).context("Failed to restore indexes")?;

    println!("idspace {} - {} index(es)", idspace::VERSION, config.indexes.len());
    for key in backend.list_indexes() {
        let index = backend
            .get_index(&key)
            .with_context(|| format!("index {} vanished", key))?;
        let size = backend.index_size(&key)?;
        println!("{:<32} {:<8} {} slot(s)", key.to_string(), index.id_type.to_string(), size);

        if args.entries {
            let mut entries = backend.list_entries(&key)?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                println!("    {:<24} {}", entry.id, entry.claim_name);
            }
        }
    }
    Ok(())
}
