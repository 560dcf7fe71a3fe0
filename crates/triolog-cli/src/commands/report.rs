//! Logbook report command

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use triolog_core::summary::DEFAULT_PROFILE;
use triolog_core::{EngineConfig, LogbookSummary, SummaryFilter, TripType};

use super::{format_duration, format_timestamp};
use crate::logbook::Logbook;

/// Parse `--type`, `--profile`, `--from` and `--to` into a filter
pub fn parse_filter(
    trip_type: Option<&str>,
    profile: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<SummaryFilter> {
    let trip_type = trip_type
        .map(|t| t.parse::<TripType>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let parse_day = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
    };
    let from = from.map(parse_day).transpose()?;
    let to = to.map(parse_day).transpose()?;

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(anyhow!("--from {} is after --to {}", from, to));
        }
    }

    Ok(SummaryFilter {
        trip_type,
        profile,
        from,
        to,
    })
}

pub fn cmd_report(
    logbook_path: &Path,
    config: &EngineConfig,
    trip_type: Option<&str>,
    profile: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let filter = parse_filter(trip_type, profile, from, to)?;
    let logbook = Logbook::load(logbook_path)?;

    let summary = LogbookSummary::compute(&logbook.trips, &filter, config.report.km_rate);
    let trips = LogbookSummary::select(&logbook.trips, &filter);

    println!();
    println!("📒 Driving logbook");
    println!("{}", "─".repeat(70));
    println!("  Trips:          {}", summary.trip_count);
    println!("  Total:          {:.1} km", summary.total_km);
    println!(
        "  Work:           {:.1} km ({} trips)",
        summary.work_km, summary.work_trip_count
    );
    println!("  Private:        {:.1} km", summary.private_km);
    println!("  Unclassified:   {:.1} km", summary.unclassified_km);
    println!("  Time driven:    {}", format_duration(summary.total_duration_s));
    println!(
        "  Compensation:   {:.2} € ({} €/km)",
        summary.compensation, summary.km_rate
    );

    if !trips.is_empty() {
        println!();
        for trip in trips {
            println!(
                "  {:<16}  {:>8.1} km  {:<12}  {}",
                format_timestamp(trip.start_time_ms),
                trip.distance_km,
                trip.trip_type.as_str(),
                trip.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
            );
        }
    }

    println!();
    Ok(())
}
