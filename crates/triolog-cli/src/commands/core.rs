//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `load_config` - Shared utility to load the engine config
//! - `cmd_init` - Create an empty logbook

use std::path::Path;

use anyhow::{Context, Result};
use triolog_core::EngineConfig;

use crate::logbook::Logbook;

/// Load config from `--config`, the user config dir, or built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load_from(path).context("Failed to load config")
}

pub fn cmd_init(logbook_path: &Path) -> Result<()> {
    println!("🔧 Creating logbook at {}...", logbook_path.display());

    Logbook::create(logbook_path)?;

    println!("✅ Logbook initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record a trip: triolog track --replay track.csv");
    println!("  2. Scan a receipt: triolog scan --file receipt.txt");

    Ok(())
}
