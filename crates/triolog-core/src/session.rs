//! Trip session state machine
//!
//! A session is either Idle or Tracking. While Tracking it owns the position
//! subscription, the odometer and the duration clock as one value, so a reader
//! holding `&self` can never see a sample half-applied. `stop()` cancels the
//! subscription before the draft is computed; anything the source sends after
//! that point is dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;
use crate::error::{Error, Result};
use crate::geo::{Odometer, SampleVerdict};
use crate::models::{GeoSample, PositionError, TripDraft};
use crate::position::{PositionEvent, PositionSource, Subscription};

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The real clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Live view of a tracking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub started_at_ms: i64,
    pub distance_km: f64,
    pub duration_s: u64,
    /// Last position accepted as real movement
    pub anchor: Option<GeoSample>,
    /// Most recent position source failure, if any
    pub last_error: Option<PositionError>,
}

/// Something that happened while driving the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A sample arrived and went through the jitter filter
    Moved {
        verdict: SampleVerdict,
        snapshot: SessionSnapshot,
    },
    /// The duration clock advanced
    Tick(SessionSnapshot),
    /// The source reported a failure; tracking continues
    PositionError(PositionError),
    /// The source will deliver no more fixes
    SourceClosed,
}

/// State owned by a Tracking session
#[derive(Debug)]
struct ActiveSession {
    started_at_ms: i64,
    odometer: Odometer,
    duration_s: u64,
    last_error: Option<PositionError>,
    subscription: Subscription,
    source_closed: bool,
    ticker: Interval,
}

impl ActiveSession {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            started_at_ms: self.started_at_ms,
            distance_km: self.odometer.total_km(),
            duration_s: self.duration_s,
            anchor: self.odometer.anchor().copied(),
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Debug)]
enum SessionState {
    Idle,
    Tracking(ActiveSession),
}

/// Turns a position stream into a trip draft
pub struct TripSession {
    config: TrackingConfig,
    clock: Arc<dyn Clock>,
    state: SessionState,
}

impl TripSession {
    pub fn new(config: TrackingConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TrackingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: SessionState::Idle,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, SessionState::Tracking(_))
    }

    /// Begin tracking from `source`
    ///
    /// Fails with `UnsupportedSource` if the source cannot deliver fixes and
    /// with `InvalidState` if a trip is already being tracked. On failure the
    /// session stays Idle.
    pub async fn start(&mut self, source: &dyn PositionSource) -> Result<()> {
        if self.is_tracking() {
            return Err(Error::InvalidState(
                "start() called while already tracking".to_string(),
            ));
        }
        if !source.is_available() {
            return Err(Error::UnsupportedSource(format!(
                "{} is not available",
                source.name()
            )));
        }

        // Read before subscribing so a replay clock is still at the first fix
        let started_at_ms = self.clock.now_ms();
        let subscription = source.subscribe(&self.config.sampling).await?;

        let period = self.config.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.state = SessionState::Tracking(ActiveSession {
            started_at_ms,
            odometer: Odometer::new(self.config.min_movement_km),
            duration_s: 0,
            last_error: None,
            subscription,
            source_closed: false,
            ticker,
        });

        info!(source = source.name(), started_at_ms, "trip tracking started");
        Ok(())
    }

    /// Apply one sample; ignored (None) unless tracking
    pub fn ingest(&mut self, sample: GeoSample) -> Option<SampleVerdict> {
        let SessionState::Tracking(active) = &mut self.state else {
            debug!("sample ignored while idle");
            return None;
        };
        Some(active.odometer.offer(sample))
    }

    /// Refresh elapsed seconds from the clock; returns the new value
    pub fn tick(&mut self) -> Option<u64> {
        let now = self.clock.now_ms();
        let SessionState::Tracking(active) = &mut self.state else {
            return None;
        };
        active.duration_s = elapsed_secs(active.started_at_ms, now);
        Some(active.duration_s)
    }

    /// Wait for the next sample, source error or clock tick and apply it
    ///
    /// Returns None while Idle. After `SourceClosed` only ticks follow; the
    /// host decides when to stop.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let SessionState::Tracking(active) = &mut self.state else {
            return None;
        };

        tokio::select! {
            event = active.subscription.next(), if !active.source_closed => {
                match event {
                    Some(PositionEvent::Sample(sample)) => {
                        let verdict = active.odometer.offer(sample);
                        Some(SessionEvent::Moved {
                            verdict,
                            snapshot: active.snapshot(),
                        })
                    }
                    Some(PositionEvent::Error(error)) => {
                        warn!(kind = error.kind.as_str(), "position source error: {}", error.message);
                        active.last_error = Some(error.clone());
                        Some(SessionEvent::PositionError(error))
                    }
                    None => {
                        debug!(source = active.subscription.source_name(), "position source closed");
                        active.source_closed = true;
                        Some(SessionEvent::SourceClosed)
                    }
                }
            }
            _ = active.ticker.tick() => {
                active.duration_s = elapsed_secs(active.started_at_ms, self.clock.now_ms());
                Some(SessionEvent::Tick(active.snapshot()))
            }
        }
    }

    /// Current distance and duration, None while Idle
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Tracking(active) => Some(active.snapshot()),
        }
    }

    /// End the trip and hand back its draft
    ///
    /// The subscription is cancelled before anything else, so a late sample
    /// cannot change the returned draft.
    pub fn stop(&mut self) -> Result<TripDraft> {
        let state = std::mem::replace(&mut self.state, SessionState::Idle);
        let SessionState::Tracking(mut active) = state else {
            return Err(Error::InvalidState("stop() called while idle".to_string()));
        };

        active.subscription.cancel();

        let end_time_ms = self.clock.now_ms();
        let draft = TripDraft {
            start_time_ms: active.started_at_ms,
            end_time_ms,
            distance_km: active.odometer.total_km(),
            duration_s: elapsed_secs(active.started_at_ms, end_time_ms),
        };

        info!(
            distance_km = draft.distance_km,
            duration_s = draft.duration_s,
            "trip tracking stopped"
        );
        Ok(draft)
    }
}

/// Whole seconds between two epoch-millisecond instants, never negative
fn elapsed_secs(start_ms: i64, now_ms: i64) -> u64 {
    (now_ms.saturating_sub(start_ms).max(0) / 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PositionErrorKind;
    use crate::position::{ReplaySource, UnavailableSource};
    use crate::test_utils::{ChannelSource, ManualClock};

    fn session(clock: &Arc<ManualClock>) -> TripSession {
        TripSession::with_clock(TrackingConfig::default(), clock.clone())
    }

    #[test]
    fn test_elapsed_secs_floors() {
        assert_eq!(elapsed_secs(1_000, 1_999), 0);
        assert_eq!(elapsed_secs(1_000, 3_500), 2);
        assert_eq!(elapsed_secs(5_000, 1_000), 0);
    }

    #[tokio::test]
    async fn test_start_then_stop_without_samples() {
        let clock = ManualClock::new(1_700_000_000_000);
        let mut session = session(&clock);
        let source = ReplaySource::from_samples(vec![]);

        session.start(&source).await.unwrap();
        assert!(session.is_tracking());
        clock.advance_ms(2_500);

        let draft = session.stop().unwrap();
        assert_eq!(draft.distance_km, 0.0);
        assert_eq!(draft.duration_s, 2);
        assert_eq!(draft.start_time_ms, 1_700_000_000_000);
        assert_eq!(draft.end_time_ms, 1_700_000_002_500);
        assert!(!session.is_tracking());
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_invalid() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);
        assert!(matches!(session.stop(), Err(Error::InvalidState(_))));

        let source = ReplaySource::from_samples(vec![]);
        session.start(&source).await.unwrap();
        session.stop().unwrap();
        assert!(matches!(session.stop(), Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);
        let source = ReplaySource::from_samples(vec![]);

        session.start(&source).await.unwrap();
        assert!(matches!(
            session.start(&source).await,
            Err(Error::InvalidState(_))
        ));
        assert!(session.is_tracking());
    }

    #[tokio::test]
    async fn test_unavailable_source_keeps_idle() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);

        let result = session.start(&UnavailableSource::new("no GPS")).await;
        assert!(matches!(result, Err(Error::UnsupportedSource(_))));
        assert!(!session.is_tracking());
        assert!(session.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_ingest_accumulates_while_tracking() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);
        session
            .start(&ReplaySource::from_samples(vec![]))
            .await
            .unwrap();

        assert_eq!(
            session.ingest(GeoSample::new(62.6, 29.76, 0)),
            Some(SampleVerdict::Anchored)
        );
        assert!(session
            .ingest(GeoSample::new(62.601, 29.76, 1_000))
            .unwrap()
            .is_accepted());

        let snap = session.snapshot().unwrap();
        assert!((snap.distance_km - 0.111).abs() < 0.001);
        assert_eq!(snap.anchor.unwrap().latitude, 62.601);
    }

    #[tokio::test]
    async fn test_ingest_after_stop_is_ignored() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);
        session
            .start(&ReplaySource::from_samples(vec![]))
            .await
            .unwrap();
        session.ingest(GeoSample::new(62.6, 29.76, 0));
        session.ingest(GeoSample::new(62.61, 29.76, 0));
        let draft = session.stop().unwrap();

        assert_eq!(session.ingest(GeoSample::new(63.0, 29.76, 0)), None);
        assert!(draft.distance_km > 1.0 && draft.distance_km < 1.2);
    }

    #[tokio::test]
    async fn test_events_from_subscription() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);
        let source = ChannelSource::new();
        session.start(&source).await.unwrap();

        let sender = source.sender().unwrap();
        assert!(sender.send_sample(GeoSample::new(62.6, 29.76, 0)).await);
        assert!(sender.send_sample(GeoSample::new(62.601, 29.76, 1)).await);
        assert!(
            sender
                .send_error(PositionError::new(PositionErrorKind::Timeout, "no fix"))
                .await
        );
        drop(sender);
        source.close();

        assert!(matches!(
            session.next_event().await,
            Some(SessionEvent::Moved {
                verdict: SampleVerdict::Anchored,
                ..
            })
        ));
        let Some(SessionEvent::Moved { verdict, snapshot }) = session.next_event().await else {
            panic!("expected movement");
        };
        assert!(verdict.is_accepted());
        assert!(snapshot.distance_km > 0.1);

        assert!(matches!(
            session.next_event().await,
            Some(SessionEvent::PositionError(_))
        ));
        // Errors do not stop the session
        assert!(session.is_tracking());
        assert_eq!(
            session.snapshot().unwrap().last_error.unwrap().kind,
            PositionErrorKind::Timeout
        );

        assert_eq!(session.next_event().await, Some(SessionEvent::SourceClosed));
        assert!(session.is_tracking());
    }

    #[tokio::test]
    async fn test_stop_cancels_subscription() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);
        let source = ChannelSource::new();
        session.start(&source).await.unwrap();
        let sender = source.sender().unwrap();

        session.stop().unwrap();

        assert!(sender.is_closed());
        assert!(!sender.send_sample(GeoSample::new(1.0, 1.0, 0)).await);
        assert_eq!(session.next_event().await, None);
    }

    #[tokio::test]
    async fn test_tick_tracks_clock() {
        let clock = ManualClock::new(10_000);
        let mut session = session(&clock);
        assert_eq!(session.tick(), None);

        session
            .start(&ReplaySource::from_samples(vec![]))
            .await
            .unwrap();
        clock.advance_ms(61_900);
        assert_eq!(session.tick(), Some(61));
        assert_eq!(session.snapshot().unwrap().duration_s, 61);
    }

    #[tokio::test]
    async fn test_restart_resets_state() {
        let clock = ManualClock::new(0);
        let mut session = session(&clock);
        let source = ReplaySource::from_samples(vec![]);

        session.start(&source).await.unwrap();
        session.ingest(GeoSample::new(62.6, 29.76, 0));
        session.ingest(GeoSample::new(62.7, 29.76, 0));
        session.stop().unwrap();

        clock.advance_ms(5_000);
        session.start(&source).await.unwrap();
        let snap = session.snapshot().unwrap();
        assert_eq!(snap.distance_km, 0.0);
        assert!(snap.anchor.is_none());
        assert_eq!(snap.started_at_ms, 5_000);
    }
}
