//! Great-circle distance and jitter filtering
//!
//! The odometer keeps only the last accepted sample (the anchor) and a running
//! total. A new sample counts as movement only if it lies further than the
//! movement threshold from the anchor; anything closer is GPS jitter and is
//! dropped without moving the anchor.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::models::GeoSample;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default movement threshold (5 m)
pub const DEFAULT_MIN_MOVEMENT_KM: f64 = 0.005;

/// Haversine distance in kilometers between two (lat, lon) pairs in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair past 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Distance between two samples in kilometers
pub fn sample_distance_km(a: &GeoSample, b: &GeoSample) -> f64 {
    haversine_km(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Outcome of offering a sample to the odometer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SampleVerdict {
    /// First sample of the trip; becomes the anchor, adds no distance
    Anchored,
    /// Real movement; anchor advanced and `step_km` added to the total
    Accepted { step_km: f64 },
    /// Within the movement threshold of the anchor; discarded
    Rejected { jitter_km: f64 },
    /// Coordinates outside the valid range; discarded
    Invalid,
}

impl SampleVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Anchored | Self::Accepted { .. })
    }
}

/// Running distance accumulator with jitter suppression
#[derive(Debug, Clone, PartialEq)]
pub struct Odometer {
    min_movement_km: f64,
    anchor: Option<GeoSample>,
    total_km: f64,
}

impl Default for Odometer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MOVEMENT_KM)
    }
}

impl Odometer {
    pub fn new(min_movement_km: f64) -> Self {
        Self {
            min_movement_km: min_movement_km.max(0.0),
            anchor: None,
            total_km: 0.0,
        }
    }

    /// Filter a sample and, if it is real movement, fold it into the total
    pub fn offer(&mut self, sample: GeoSample) -> SampleVerdict {
        if !sample.is_valid() {
            return SampleVerdict::Invalid;
        }

        let Some(anchor) = self.anchor else {
            self.anchor = Some(sample);
            return SampleVerdict::Anchored;
        };

        let step_km = sample_distance_km(&anchor, &sample);
        if step_km > self.min_movement_km {
            self.total_km += step_km;
            self.anchor = Some(sample);
            SampleVerdict::Accepted { step_km }
        } else {
            trace!(jitter_km = step_km, "sample_rejected");
            SampleVerdict::Rejected { jitter_km: step_km }
        }
    }

    pub fn total_km(&self) -> f64 {
        self.total_km
    }

    pub fn anchor(&self) -> Option<&GeoSample> {
        self.anchor.as_ref()
    }

    pub fn min_movement_km(&self) -> f64 {
        self.min_movement_km
    }

    /// Zero the total and forget the anchor
    pub fn reset(&mut self) {
        self.anchor = None;
        self.total_km = 0.0;
    }
}
