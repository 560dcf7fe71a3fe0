//! Receipt scanning CLI command

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use triolog_core::{
    Confidence, EngineConfig, ExtractedReceipt, ReceiptExtractor, ReconciliationMatcher,
    SuggestionAction,
};

use super::format_timestamp;
use crate::logbook::Logbook;

/// Extract fields from recognized receipt text and suggest a trip for it
pub fn cmd_scan(
    logbook_path: &Path,
    config: &EngineConfig,
    file: &Path,
    date: Option<&str>,
    no_reconcile: bool,
) -> Result<()> {
    if !file.exists() {
        return Err(anyhow!("File not found: {}", file.display()));
    }
    let text = std::fs::read_to_string(file).context("Failed to read receipt text")?;

    let mut logbook = Logbook::load(logbook_path)?;

    let extractor = ReceiptExtractor::with_catalog(config.receipt_catalog())
        .with_known_vendors(logbook.vendors.iter().cloned());
    let mut receipt = extractor.extract(&text);

    if let Some(date) = date {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
        receipt = receipt.with_date_override(date);
    }

    print_receipt(&receipt);

    if no_reconcile {
        return Ok(());
    }

    if logbook.has_receipt(&receipt.content_hash()) {
        println!("Receipt already scanned; see: triolog suggestions list --all");
        return Ok(());
    }

    let matcher = ReconciliationMatcher::new(config.reconciliation.clone());
    let Some(suggestion) = matcher.reconcile(&receipt, &logbook.trips) else {
        println!("⚠️  No purchase date and time found, cannot match to a trip");
        println!("   Pass the date with --date YYYY-MM-DD if the receipt shows a time");
        return Ok(());
    };

    let description = match &suggestion.action {
        SuggestionAction::Classify { target_trip_id } => {
            format!("mark trip #{} as work", target_trip_id)
        }
        SuggestionAction::ProposedTrip { proposed_trip } => format!(
            "add a {}-minute {} trip ending {}",
            proposed_trip.duration_s / 60,
            proposed_trip.trip_type.as_str(),
            format_timestamp(proposed_trip.end_time_ms)
        ),
    };

    let id = logbook.add_suggestion(suggestion);
    logbook.save(logbook_path)?;

    println!();
    println!("💡 Suggestion #{}: {}", id, description);
    println!("   Accept with: triolog suggestions accept {}", id);

    Ok(())
}

fn print_receipt(receipt: &ExtractedReceipt) {
    let confidence = match receipt.confidence {
        Confidence::High => "✓ high",
        Confidence::Medium => "⚠️  medium",
        Confidence::Low => "❓ low",
    };

    println!();
    println!("🧾 Receipt");
    println!("{}", "─".repeat(70));
    println!(
        "  Store:      {}{}",
        receipt.store_name.as_deref().unwrap_or("Unknown"),
        if receipt.matched_vendor {
            " (known vendor)"
        } else {
            ""
        }
    );
    println!("  Date:       {}", receipt.date.as_deref().unwrap_or("Unknown"));
    println!("  Time:       {}", receipt.time.as_deref().unwrap_or("Unknown"));
    println!(
        "  Total:      {}",
        receipt
            .total
            .as_deref()
            .map(|t| format!("{} €", t))
            .unwrap_or_else(|| "N/A".to_string())
    );
    println!("  Confidence: {}", confidence);
}
