//! Trip command implementations

use std::path::Path;

use anyhow::{anyhow, Result};
use triolog_core::TripType;

use super::{format_duration, format_timestamp, truncate};
use crate::logbook::Logbook;

pub fn cmd_trips_list(logbook_path: &Path, limit: usize) -> Result<()> {
    let logbook = Logbook::load(logbook_path)?;
    let trips = logbook.recent_trips(limit);

    if trips.is_empty() {
        println!("No trips recorded yet. Record one with: triolog track --replay track.csv");
        return Ok(());
    }

    println!();
    println!(
        "{:>4}  {:<16}  {:>9}  {:>8}  {:<12}  {}",
        "ID", "Started", "Km", "Duration", "Type", "Profile"
    );
    println!("{}", "─".repeat(70));

    for trip in &trips {
        println!(
            "{:>4}  {:<16}  {:>9.2}  {:>8}  {:<12}  {}",
            trip.id,
            format_timestamp(trip.start_time_ms),
            trip.distance_km,
            format_duration(trip.duration_s),
            trip.trip_type.as_str(),
            truncate(trip.profile.as_deref().unwrap_or("-"), 20)
        );
    }

    println!();
    println!("Showing {} of {} trips", trips.len(), logbook.trips.len());

    Ok(())
}

pub fn cmd_trips_classify(logbook_path: &Path, id: i64, trip_type: &str) -> Result<()> {
    let trip_type: TripType = trip_type.parse().map_err(|e: String| anyhow!(e))?;

    let mut logbook = Logbook::load(logbook_path)?;
    logbook.classify_trip(id, trip_type)?;
    logbook.save(logbook_path)?;

    println!("✅ Trip #{} marked as {}", id, trip_type.as_str());
    if let Some(trip) = logbook.trip(id) {
        println!(
            "   {} · {:.2} km",
            format_timestamp(trip.start_time_ms),
            trip.distance_km
        );
    }
    Ok(())
}

pub fn cmd_trips_delete(logbook_path: &Path, id: i64) -> Result<()> {
    let mut logbook = Logbook::load(logbook_path)?;
    let trip = logbook.delete_trip(id)?;
    logbook.save(logbook_path)?;

    println!(
        "🗑  Deleted trip #{} ({:.2} km, {})",
        trip.id,
        trip.distance_km,
        format_timestamp(trip.start_time_ms)
    );
    Ok(())
}
