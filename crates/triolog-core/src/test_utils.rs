//! Test helpers shared by unit tests, integration tests and the CLI crate

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{GeoSample, TripRecord, TripType};
use crate::position::{PositionSender, PositionSource, SamplingOptions, Subscription};
use crate::session::Clock;

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(start_ms),
        })
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Source whose sender is handed to the test after `subscribe`
#[derive(Debug, Default)]
pub struct ChannelSource {
    sender: Mutex<Option<PositionSender>>,
}

impl ChannelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender for the most recent subscription
    pub fn sender(&self) -> Option<PositionSender> {
        self.sender.lock().ok().and_then(|s| s.clone())
    }

    /// Drop the retained sender so the subscription can end
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

#[async_trait]
impl PositionSource for ChannelSource {
    fn name(&self) -> &str {
        "channel"
    }

    async fn subscribe(&self, _options: &SamplingOptions) -> Result<Subscription> {
        let (sender, subscription) = Subscription::channel("channel", 64);
        if let Ok(mut slot) = self.sender.lock() {
            *slot = Some(sender);
        }
        Ok(subscription)
    }
}

/// A straight northbound track of `steps` samples
///
/// Each step moves `step_deg` degrees of latitude (0.001° ≈ 111 m) and
/// `interval_ms` later in time.
pub fn northbound_track(
    start: GeoSample,
    steps: usize,
    step_deg: f64,
    interval_ms: i64,
) -> Vec<GeoSample> {
    (0..steps)
        .map(|i| {
            GeoSample::new(
                start.latitude + step_deg * i as f64,
                start.longitude,
                start.timestamp_ms + interval_ms * i as i64,
            )
        })
        .collect()
}

/// Samples scattered within about 2 m of `center`
pub fn jitter_around(center: GeoSample, count: usize) -> Vec<GeoSample> {
    const OFFSETS: [(f64, f64); 4] = [
        (0.00001, 0.0),
        (-0.00001, 0.00002),
        (0.0, -0.00002),
        (0.000015, 0.00001),
    ];
    (0..count)
        .map(|i| {
            let (dlat, dlon) = OFFSETS[i % OFFSETS.len()];
            GeoSample::new(
                center.latitude + dlat,
                center.longitude + dlon,
                center.timestamp_ms + i as i64 * 1000,
            )
        })
        .collect()
}

/// Minimal trip record ending at `end_time_ms`
pub fn trip_ending_at(id: i64, end_time_ms: i64) -> TripRecord {
    TripRecord {
        id,
        start_time_ms: end_time_ms - 20 * 60_000,
        end_time_ms,
        distance_km: 10.0,
        duration_s: 1200,
        trip_type: TripType::Unclassified,
        profile: None,
        start_address: None,
        end_address: None,
    }
}
