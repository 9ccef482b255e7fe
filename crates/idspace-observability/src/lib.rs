// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # idspace-observability
//!
//! Logging setup shared by idspace binaries, with per-crate debug flags.
//! Library crates only emit `tracing` events; installing a subscriber is
//! left to the binary through [`init_console_logging`] or [`init_logging`].
//!
//! ## Features
//! - `file-logging`: JSON log files per run with retention cleanup

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known idspace crate names for debug flags (also used as tracing targets)
pub const KNOWN_CRATES: &[&str] = &[
    "idspace-structures",
    "idspace-table",
    "idspace-backend",
    "idspace-config",
    "idspace-observability",
];
