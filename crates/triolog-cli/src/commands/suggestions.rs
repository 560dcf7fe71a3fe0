//! Suggestion review commands

use std::path::Path;

use anyhow::Result;
use triolog_core::{SuggestionAction, SuggestionStatus};

use super::{format_duration, format_timestamp};
use crate::logbook::{Applied, Logbook};

pub fn cmd_suggestions_list(logbook_path: &Path, all: bool) -> Result<()> {
    let logbook = Logbook::load(logbook_path)?;
    let shown: Vec<_> = logbook
        .suggestions
        .iter()
        .filter(|s| all || s.suggestion.is_pending())
        .collect();

    if shown.is_empty() {
        println!("No pending suggestions");
        return Ok(());
    }

    println!("\n💡 Suggestions ({})", shown.len());
    println!("{}", "─".repeat(70));

    for stored in shown {
        let s = &stored.suggestion;
        let status = match s.status {
            SuggestionStatus::Pending => "⏳",
            SuggestionStatus::Accepted => "✓",
            SuggestionStatus::Rejected => "✗",
        };
        let store = s.store_name.as_deref().unwrap_or("Unknown store");

        println!(
            "  #{:<4} {} {} - {}",
            stored.id,
            status,
            store,
            format_timestamp(s.receipt_timestamp_ms)
        );
        match &s.action {
            SuggestionAction::Classify { target_trip_id } => {
                println!("         Visited {}? Mark trip #{} as work", store, target_trip_id);
            }
            SuggestionAction::ProposedTrip { proposed_trip } => {
                println!(
                    "         Add trip to {}? {} → {} ({}, {})",
                    store,
                    format_timestamp(proposed_trip.start_time_ms),
                    format_timestamp(proposed_trip.end_time_ms),
                    format_duration(proposed_trip.duration_s),
                    proposed_trip.trip_type.as_str()
                );
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_suggestions_accept(logbook_path: &Path, id: i64) -> Result<()> {
    let mut logbook = Logbook::load(logbook_path)?;
    let applied = logbook.accept_suggestion(id)?;
    logbook.save(logbook_path)?;

    match applied {
        Applied::Classified { trip_id } => {
            println!("✅ Suggestion #{} accepted: trip #{} marked as work", id, trip_id)
        }
        Applied::Inserted { trip_id } => {
            println!("✅ Suggestion #{} accepted: added trip #{}", id, trip_id)
        }
    }

    if let Some(store) = logbook
        .suggestion(id)
        .and_then(|s| s.suggestion.store_name.as_deref())
    {
        println!("   {} remembered as a known vendor", store);
    }
    Ok(())
}

pub fn cmd_suggestions_reject(logbook_path: &Path, id: i64) -> Result<()> {
    let mut logbook = Logbook::load(logbook_path)?;
    logbook.reject_suggestion(id)?;
    logbook.save(logbook_path)?;

    println!("Suggestion #{} rejected", id);
    Ok(())
}
