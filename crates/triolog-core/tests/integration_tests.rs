//! Integration tests for triolog-core
//!
//! These tests exercise the full track → stop → scan → reconcile workflow.

use chrono::{TimeZone, Utc};
use triolog_core::{
    read_samples_csv, Confidence, EngineConfig, GeoSample, Odometer, PositionError,
    PositionErrorKind, PositionEvent, ReceiptExtractor, ReconciliationMatcher, ReplayClock,
    ReplaySource,
    SessionEvent, SuggestionKind, TrackingConfig, TripDraft, TripRecord, TripSession, TripType,
};

const MINUTE_MS: i64 = 60_000;

/// A short drive north out of Joensuu centre, one fix every 5 s
/// - 11 fixes 0.001° apart (~111 m each, ~1.11 km total)
/// - a stop at the lights with ~1-2 m of jitter in the middle
fn recorded_track_csv() -> &'static str {
    "latitude,longitude,timestamp_ms
62.6000,29.7600,1742560000000
62.6010,29.7600,1742560005000
62.6020,29.7600,1742560010000
62.6030,29.7600,1742560015000
62.60301,29.7600,1742560020000
62.60299,29.76001,1742560025000
62.6030,29.75999,1742560030000
62.6040,29.7600,1742560035000
62.6050,29.7600,1742560040000
62.6060,29.7600,1742560045000
62.6070,29.7600,1742560050000
62.6080,29.7600,1742560055000
62.6090,29.7600,1742560060000
62.6100,29.7600,1742560065000"
}

fn receipt_text() -> &'static str {
    "K-Market Rantakylä\n\
     Maito 1,25\n\
     Ruisleipä 3,49\n\
     21.03.2025 14:32\n\
     Yhteensä 45,90 €\n\
     Pankkikortti 45,90"
}

/// Drive a session over `events` until the source runs dry, then stop
async fn run_replay(events: Vec<PositionEvent>) -> (TripDraft, Vec<SessionEvent>) {
    let mut session = TripSession::new(TrackingConfig::default());
    session
        .start(&ReplaySource::new(events))
        .await
        .expect("Failed to start session");

    let mut seen = Vec::new();
    while let Some(event) = session.next_event().await {
        let done = event == SessionEvent::SourceClosed;
        seen.push(event);
        if done {
            break;
        }
    }

    let draft = session.stop().expect("Failed to stop session");
    (draft, seen)
}

// =============================================================================
// Trip Tracking Integration Tests
// =============================================================================

#[tokio::test]
async fn test_replayed_track_distance() {
    let samples = read_samples_csv(recorded_track_csv().as_bytes()).expect("Failed to parse track");
    assert_eq!(samples.len(), 14);

    let (draft, events) = run_replay(samples.into_iter().map(PositionEvent::Sample).collect()).await;

    // Ten real steps of ~111.2 m; the jitter at the lights adds nothing
    assert!(
        (draft.distance_km - 1.112).abs() < 0.005,
        "got {}",
        draft.distance_km
    );
    assert!(draft.end_time_ms >= draft.start_time_ms);

    let rejected = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Moved { verdict, .. } if !verdict.is_accepted()))
        .count();
    assert_eq!(rejected, 3);
}

#[tokio::test]
async fn test_replay_is_deterministic() {
    let samples = read_samples_csv(recorded_track_csv().as_bytes()).expect("Failed to parse track");
    let events: Vec<PositionEvent> = samples.iter().copied().map(PositionEvent::Sample).collect();

    let (first, _) = run_replay(events.clone()).await;
    let (second, _) = run_replay(events).await;
    assert_eq!(first.distance_km, second.distance_km);

    // Recomputing from the raw samples gives the same figure
    let mut odometer = Odometer::default();
    for sample in samples {
        odometer.offer(sample);
    }
    assert_eq!(odometer.total_km(), first.distance_km);
}

#[tokio::test]
async fn test_replay_clock_times_trip_from_fixes() {
    let samples = read_samples_csv(recorded_track_csv().as_bytes()).expect("Failed to parse track");
    let source = ReplaySource::from_samples(samples);
    let clock = ReplayClock::starting_at(source.first_timestamp_ms().expect("No fixes"));

    let mut session = TripSession::with_clock(TrackingConfig::default(), clock.clone());
    session
        .start(&source.with_clock(clock))
        .await
        .expect("Failed to start session");
    while let Some(event) = session.next_event().await {
        if event == SessionEvent::SourceClosed {
            break;
        }
    }

    let draft = session.stop().expect("Failed to stop session");
    assert_eq!(draft.start_time_ms, 1_742_560_000_000);
    assert_eq!(draft.end_time_ms, 1_742_560_065_000);
    assert_eq!(draft.duration_s, 65);
}

#[tokio::test]
async fn test_position_errors_do_not_end_trip() {
    let events = vec![
        PositionEvent::Sample(GeoSample::new(62.60, 29.76, 0)),
        PositionEvent::Error(PositionError::new(PositionErrorKind::Timeout, "no fix")),
        PositionEvent::Sample(GeoSample::new(62.61, 29.76, 10_000)),
    ];

    let (draft, seen) = run_replay(events).await;
    assert!(seen
        .iter()
        .any(|e| matches!(e, SessionEvent::PositionError(err) if err.kind == PositionErrorKind::Timeout)));
    assert!(draft.distance_km > 1.0);
}

#[tokio::test]
async fn test_start_stop_without_samples() {
    let (draft, _) = run_replay(vec![]).await;
    assert_eq!(draft.distance_km, 0.0);
}

// =============================================================================
// Receipt Reconciliation Integration Tests
// =============================================================================

#[test]
fn test_receipt_confirms_recorded_trip() {
    let receipt = ReceiptExtractor::new().extract(receipt_text());
    assert_eq!(receipt.date.as_deref(), Some("21.03.2025"));
    assert_eq!(receipt.total.as_deref(), Some("45,90"));
    assert_eq!(receipt.store_name.as_deref(), Some("K-Market"));
    assert_eq!(receipt.confidence, Confidence::High);

    let purchase = Utc
        .with_ymd_and_hms(2025, 3, 21, 14, 32, 0)
        .unwrap()
        .timestamp_millis();

    // The drive to the shop ended at 14:50
    let draft = TripDraft {
        start_time_ms: purchase - 2 * MINUTE_MS,
        end_time_ms: purchase + 18 * MINUTE_MS,
        distance_km: 8.4,
        duration_s: 1200,
    };
    let history = vec![TripRecord::from_draft(1, &draft)];

    let suggestion = ReconciliationMatcher::default()
        .reconcile_in(&receipt, &history, &Utc)
        .expect("Receipt should have a timestamp");

    assert_eq!(suggestion.kind(), SuggestionKind::Classify);
    assert_eq!(suggestion.target_trip_id(), Some(1));
    assert_eq!(suggestion.receipt_timestamp_ms, purchase);
}

#[test]
fn test_receipt_without_trip_proposes_one() {
    let receipt = ReceiptExtractor::new().extract(receipt_text());
    let purchase = receipt.timestamp_ms_in(&Utc).unwrap();

    // Nearest trip ended at 15:10, 38 minutes after the purchase
    let draft = TripDraft {
        start_time_ms: purchase + 20 * MINUTE_MS,
        end_time_ms: purchase + 38 * MINUTE_MS,
        distance_km: 3.0,
        duration_s: 1080,
    };
    let history = vec![TripRecord::from_draft(1, &draft)];

    let suggestion = ReconciliationMatcher::default()
        .reconcile_in(&receipt, &history, &Utc)
        .unwrap();
    assert_eq!(suggestion.kind(), SuggestionKind::ProposedTrip);

    let proposed = suggestion.proposed_trip().unwrap();
    let inserted = TripRecord::from_proposed(2, proposed);
    assert_eq!(inserted.trip_type, TripType::Work);
    assert_eq!(inserted.end_time_ms, purchase);
    assert_eq!(inserted.duration_s, 900);
}

#[test]
fn test_configured_window_changes_outcome() {
    let config = EngineConfig::from_toml("[reconciliation]\nmatch_window_minutes = 45")
        .expect("Failed to parse config");
    let matcher = ReconciliationMatcher::new(config.reconciliation.clone());

    let receipt = ReceiptExtractor::with_catalog(config.receipt_catalog()).extract(receipt_text());
    let purchase = receipt.timestamp_ms_in(&Utc).unwrap();
    let history = vec![TripRecord::from_draft(
        9,
        &TripDraft {
            start_time_ms: purchase,
            end_time_ms: purchase + 38 * MINUTE_MS,
            distance_km: 3.0,
            duration_s: 2280,
        },
    )];

    let suggestion = matcher.reconcile_in(&receipt, &history, &Utc).unwrap();
    assert_eq!(suggestion.target_trip_id(), Some(9));
}

#[test]
fn test_receipt_without_time_is_not_reconciled() {
    let receipt = ReceiptExtractor::new().extract("Neste Kontiolahti\n21.03.2025\nDiesel 62,10 €");
    assert_eq!(receipt.confidence, Confidence::High);
    assert!(receipt.time.is_none());

    let history: Vec<TripRecord> = vec![];
    assert!(ReconciliationMatcher::default()
        .reconcile_in(&receipt, &history, &Utc)
        .is_none());
}
