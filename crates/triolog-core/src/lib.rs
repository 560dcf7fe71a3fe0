//! TrioLog Core Library
//!
//! Shared functionality for the TrioLog driving logbook:
//! - Geo sample filtering and great-circle distance accumulation
//! - Position source interface with cancellable subscriptions
//! - Trip session state machine producing trip drafts
//! - Receipt field extraction and confidence scoring
//! - Receipt-to-trip reconciliation suggestions
//! - Logbook summaries for reporting
//! - Layered engine configuration

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod position;
pub mod receipts;
pub mod reconcile;
pub mod session;
pub mod summary;

/// Test utilities including a manually advanced clock
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{EngineConfig, ReportConfig, TrackingConfig};
pub use error::{Error, Result};
pub use geo::{haversine_km, Odometer, SampleVerdict};
pub use models::{
    Confidence, ExtractedReceipt, GeoSample, PositionError, PositionErrorKind, ProposedTrip,
    ReconciliationSuggestion, SuggestionAction, SuggestionKind, SuggestionStatus, TripDraft,
    TripEndpoint, TripRecord, TripType,
};
pub use position::{
    read_samples_csv, PositionEvent, PositionSender, PositionSource, ReplayClock, ReplaySource,
    SamplingOptions, Subscription, UnavailableSource,
};
pub use receipts::{ReceiptCatalog, ReceiptExtractor};
pub use reconcile::{ReconciliationConfig, ReconciliationMatcher};
pub use session::{Clock, SessionEvent, SessionSnapshot, SystemClock, TripSession};
pub use summary::{LogbookSummary, SummaryFilter};
