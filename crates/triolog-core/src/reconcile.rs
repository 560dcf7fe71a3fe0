//! Receipt to trip reconciliation
//!
//! A receipt whose purchase time lies close to the end of a recorded trip
//! confirms that trip's purpose. A receipt with no such trip implies an
//! unrecorded drive, so a trip ending at the purchase is proposed instead.
//! The matcher only produces suggestions; applying one is the host's job.

use chrono::{Duration, Local, TimeZone};
use tracing::{debug, info};

use crate::models::{
    ExtractedReceipt, ProposedTrip, ReconciliationSuggestion, SuggestionAction, SuggestionStatus,
    TripEndpoint, TripType,
};

/// Matching tunables
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationConfig {
    /// A trip ending within this distance of the purchase time matches
    pub match_window: Duration,
    /// Length of the drive assumed before an unmatched purchase
    pub proposed_drive: Duration,
    /// Type given to proposed trips
    pub default_trip_type: TripType,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            match_window: Duration::minutes(30),
            proposed_drive: Duration::minutes(15),
            default_trip_type: TripType::Work,
        }
    }
}

/// Produces one suggestion per receipt
#[derive(Debug, Clone, Default)]
pub struct ReconciliationMatcher {
    config: ReconciliationConfig,
}

impl ReconciliationMatcher {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Suggest how `receipt`, bought at `receipt_timestamp_ms`, fits `history`
    ///
    /// Among trips whose end time lies within the match window (inclusive),
    /// the closest is targeted; ties go to the earlier trip in `history`.
    pub fn suggest<T: TripEndpoint>(
        &self,
        receipt: &ExtractedReceipt,
        receipt_timestamp_ms: i64,
        history: &[T],
    ) -> ReconciliationSuggestion {
        let window_ms = self.config.match_window.num_milliseconds();

        let closest = history
            .iter()
            .map(|trip| {
                let gap = trip.end_time_ms().abs_diff(receipt_timestamp_ms);
                (trip, gap)
            })
            .filter(|(_, gap)| *gap <= window_ms.unsigned_abs())
            .min_by_key(|(_, gap)| *gap);

        let action = match closest {
            Some((trip, gap)) => {
                debug!(trip_id = trip.trip_id(), gap_ms = gap, "receipt matches trip");
                SuggestionAction::Classify {
                    target_trip_id: trip.trip_id(),
                }
            }
            None => SuggestionAction::ProposedTrip {
                proposed_trip: self.propose(receipt_timestamp_ms),
            },
        };

        let suggestion = ReconciliationSuggestion {
            action,
            store_name: receipt.store_name.clone(),
            receipt_timestamp_ms,
            receipt_hash: receipt.content_hash(),
            status: SuggestionStatus::Pending,
        };

        info!(
            kind = suggestion.kind().as_str(),
            store = ?suggestion.store_name,
            "reconciliation suggested"
        );
        suggestion
    }

    /// Resolve the receipt's time in `tz` and suggest; None without a timestamp
    pub fn reconcile_in<T: TripEndpoint, Tz: TimeZone>(
        &self,
        receipt: &ExtractedReceipt,
        history: &[T],
        tz: &Tz,
    ) -> Option<ReconciliationSuggestion> {
        let Some(ts) = receipt.timestamp_ms_in(tz) else {
            debug!(
                date = ?receipt.date,
                time = ?receipt.time,
                "receipt has no usable timestamp, not reconciling"
            );
            return None;
        };
        Some(self.suggest(receipt, ts, history))
    }

    /// [`Self::reconcile_in`] using the local time zone
    pub fn reconcile<T: TripEndpoint>(
        &self,
        receipt: &ExtractedReceipt,
        history: &[T],
    ) -> Option<ReconciliationSuggestion> {
        self.reconcile_in(receipt, history, &Local)
    }

    fn propose(&self, receipt_timestamp_ms: i64) -> ProposedTrip {
        let drive = self.config.proposed_drive;
        ProposedTrip {
            start_time_ms: receipt_timestamp_ms.saturating_sub(drive.num_milliseconds()),
            end_time_ms: receipt_timestamp_ms,
            distance_km: 0.0,
            duration_s: drive.num_seconds().max(0) as u64,
            trip_type: self.config.default_trip_type,
        }
    }
}
