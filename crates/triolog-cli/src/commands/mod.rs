//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (load_config)
//! - `receipts` - Receipt scanning and reconciliation
//! - `report` - Logbook summary
//! - `suggestions` - Suggestion review (list, accept, reject)
//! - `track` - Trip tracking from a recorded position track
//! - `trips` - Trip commands (list, classify, delete)

pub mod core;
pub mod receipts;
pub mod report;
pub mod suggestions;
pub mod track;
pub mod trips;

// Re-export command functions for main.rs
pub use self::core::*;
pub use receipts::*;
pub use report::*;
pub use suggestions::*;
pub use track::*;
pub use trips::*;

use chrono::{DateTime, Local};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Epoch milliseconds as local `dd.mm.yyyy HH:MM`
pub fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|utc| utc.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Seconds as `H:MM:SS`
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
