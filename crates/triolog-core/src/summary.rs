//! Logbook summary
//!
//! Totals over a filtered slice of trip history, as printed at the top of a
//! driving logbook report.

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::models::{TripRecord, TripType};

/// Profile name for trips without one
pub const DEFAULT_PROFILE: &str = "Yleinen";

/// Which trips a summary covers; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    pub trip_type: Option<TripType>,
    pub profile: Option<String>,
    /// First day included, by trip start in local time
    pub from: Option<NaiveDate>,
    /// Last day included
    pub to: Option<NaiveDate>,
}

impl SummaryFilter {
    fn matches_in<Tz: TimeZone>(&self, trip: &TripRecord, tz: &Tz) -> bool {
        if let Some(trip_type) = self.trip_type {
            if trip.trip_type != trip_type {
                return false;
            }
        }

        if let Some(profile) = &self.profile {
            let trip_profile = trip.profile.as_deref().unwrap_or(DEFAULT_PROFILE);
            if trip_profile != profile {
                return false;
            }
        }

        if self.from.is_none() && self.to.is_none() {
            return true;
        }

        let Some(day) = trip_day(trip, tz) else {
            return false;
        };
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

fn trip_day<Tz: TimeZone>(trip: &TripRecord, tz: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(trip.start_time_ms)
        .map(|utc| utc.with_timezone(tz).date_naive())
}

/// Aggregated figures for a set of trips
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogbookSummary {
    pub trip_count: usize,
    pub work_trip_count: usize,
    pub total_km: f64,
    pub work_km: f64,
    pub private_km: f64,
    pub unclassified_km: f64,
    pub total_duration_s: u64,
    pub km_rate: f64,
    /// `work_km × km_rate`
    pub compensation: f64,
}

impl LogbookSummary {
    /// Summarize trips, resolving dates in the local time zone
    pub fn compute(trips: &[TripRecord], filter: &SummaryFilter, km_rate: f64) -> Self {
        Self::compute_in(trips, filter, km_rate, &Local)
    }

    pub fn compute_in<Tz: TimeZone>(
        trips: &[TripRecord],
        filter: &SummaryFilter,
        km_rate: f64,
        tz: &Tz,
    ) -> Self {
        let mut summary = Self {
            km_rate,
            ..Self::default()
        };

        for trip in trips.iter().filter(|t| filter.matches_in(t, tz)) {
            summary.trip_count += 1;
            summary.total_km += trip.distance_km;
            summary.total_duration_s += trip.duration_s;
            match trip.trip_type {
                TripType::Work => {
                    summary.work_trip_count += 1;
                    summary.work_km += trip.distance_km;
                }
                TripType::Private => summary.private_km += trip.distance_km,
                TripType::Unclassified => summary.unclassified_km += trip.distance_km,
            }
        }

        summary.compensation = summary.work_km * km_rate;
        summary
    }

    /// The filtered trips themselves, oldest first
    pub fn select<'a>(trips: &'a [TripRecord], filter: &SummaryFilter) -> Vec<&'a TripRecord> {
        let mut selected: Vec<&TripRecord> =
            trips.iter().filter(|t| filter.matches_in(t, &Local)).collect();
        selected.sort_by_key(|t| t.start_time_ms);
        selected
    }
}
