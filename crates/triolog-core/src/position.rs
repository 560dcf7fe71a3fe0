//! Position source interface
//!
//! A position source hands out a [`Subscription`]: an owned, cancellable
//! stream of fixes and non-fatal errors. Whoever holds the subscription
//! decides when to stop listening; cancelling closes the channel
//! synchronously, so nothing sent afterwards is ever observed.
//!
//! # Sources
//!
//! - `ReplaySource` replays a recorded sequence of events, optionally driving
//!   a `ReplayClock` so trip times follow the recorded timestamps
//! - `UnavailableSource` stands in for hosts without positioning
//! - Hosts with live hardware implement `PositionSource` and push fixes
//!   through a `PositionSender`

use std::io::Read;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{GeoSample, PositionError};
use crate::session::Clock;

/// Channel capacity for subscriptions created by built-in sources
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Sampling request passed to a position source
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingOptions {
    /// Ask for the most accurate fix the hardware can give
    pub high_accuracy: bool,
    /// Give up on a fix after this long
    pub timeout: Duration,
    /// Oldest cached fix the source may return
    pub maximum_age: Duration,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(5),
        }
    }
}

/// One item from a position subscription
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Sample(GeoSample),
    Error(PositionError),
}

/// Producer half of a subscription
#[derive(Debug, Clone)]
pub struct PositionSender {
    sender: mpsc::Sender<PositionEvent>,
}

impl PositionSender {
    /// Deliver an event; returns false once the subscriber has gone away
    pub async fn send(&self, event: PositionEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    pub async fn send_sample(&self, sample: GeoSample) -> bool {
        self.send(PositionEvent::Sample(sample)).await
    }

    pub async fn send_error(&self, error: PositionError) -> bool {
        self.send(PositionEvent::Error(error)).await
    }

    /// Non-blocking delivery for callback-style producers
    pub fn try_send(&self, event: PositionEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer half of a position stream, owned by whoever is tracking
#[derive(Debug)]
pub struct Subscription {
    source: String,
    receiver: mpsc::Receiver<PositionEvent>,
}

impl Subscription {
    /// Create a connected sender/subscription pair
    pub fn channel(source: impl Into<String>, capacity: usize) -> (PositionSender, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            PositionSender { sender },
            Self {
                source: source.into(),
                receiver,
            },
        )
    }

    /// Next event, or None once the source has finished or been cancelled
    pub async fn next(&mut self) -> Option<PositionEvent> {
        self.receiver.recv().await
    }

    /// Next already-buffered event without waiting
    pub fn try_next(&mut self) -> Option<PositionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Stop listening; buffered and future events are discarded
    pub fn cancel(&mut self) {
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        debug!(source = %self.source, "subscription cancelled");
    }

    pub fn source_name(&self) -> &str {
        &self.source
    }
}

/// Trait for anything that can stream position fixes
///
/// Implementations handle obtaining fixes from different places:
/// - Platform location services
/// - Recorded tracks
/// - etc.
///
/// Permission prompts are the host's business, not the source's.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Human-readable name for this source
    fn name(&self) -> &str;

    /// Whether the source can deliver fixes at all on this host
    fn is_available(&self) -> bool {
        true
    }

    /// Start streaming fixes sampled according to `options`
    async fn subscribe(&self, options: &SamplingOptions) -> Result<Subscription>;
}

/// Clock that follows the timestamps of replayed fixes
///
/// Moves forward only; a fix older than the current time leaves it alone.
#[derive(Debug)]
pub struct ReplayClock {
    now_ms: AtomicI64,
}

impl ReplayClock {
    pub fn starting_at(start_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(start_ms),
        })
    }

    pub fn advance_to(&self, ms: i64) {
        self.now_ms.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ReplayClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Replays a recorded event sequence, optionally paced
#[derive(Debug, Clone)]
pub struct ReplaySource {
    name: String,
    events: Vec<PositionEvent>,
    pace: Option<Duration>,
    clock: Option<Arc<ReplayClock>>,
}

impl ReplaySource {
    pub fn new(events: Vec<PositionEvent>) -> Self {
        Self {
            name: "replay".to_string(),
            events,
            pace: None,
            clock: None,
        }
    }

    pub fn from_samples(samples: impl IntoIterator<Item = GeoSample>) -> Self {
        Self::new(samples.into_iter().map(PositionEvent::Sample).collect())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Wait this long before delivering each event
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Advance `clock` to each fix's timestamp just before delivering it
    pub fn with_clock(mut self, clock: Arc<ReplayClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Timestamp of the first recorded fix
    pub fn first_timestamp_ms(&self) -> Option<i64> {
        self.events.iter().find_map(|event| match event {
            PositionEvent::Sample(sample) => Some(sample.timestamp_ms),
            PositionEvent::Error(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe(&self, options: &SamplingOptions) -> Result<Subscription> {
        debug!(
            source = %self.name,
            events = self.events.len(),
            high_accuracy = options.high_accuracy,
            "replay subscribed"
        );

        let (sender, subscription) = Subscription::channel(&self.name, DEFAULT_CHANNEL_CAPACITY);
        let events = self.events.clone();
        let pace = self.pace;
        let clock = self.clock.clone();

        tokio::spawn(async move {
            for event in events {
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
                if let (Some(clock), PositionEvent::Sample(sample)) = (&clock, &event) {
                    clock.advance_to(sample.timestamp_ms);
                }
                if !sender.send(event).await {
                    break;
                }
            }
        });

        Ok(subscription)
    }
}

/// Source for hosts with no positioning capability
#[derive(Debug, Clone)]
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PositionSource for UnavailableSource {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn subscribe(&self, _options: &SamplingOptions) -> Result<Subscription> {
        Err(Error::UnsupportedSource(self.reason.clone()))
    }
}

/// Load a recorded track with `latitude,longitude,timestamp_ms` columns
pub fn read_samples_csv<R: Read>(reader: R) -> Result<Vec<GeoSample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for record in rdr.deserialize() {
        let sample: GeoSample = record?;
        samples.push(sample);
    }

    Ok(samples)
}
