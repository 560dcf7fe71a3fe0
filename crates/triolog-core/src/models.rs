//! Data models for TrioLog

use std::fmt;

use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

// ========== Position Models ==========

/// A single position fix from the host's location source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Fix time in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl GeoSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    /// True when both coordinates are finite and inside ±90° / ±180°
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Category of a position source failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorKind {
    /// The user or platform revoked location access
    PermissionDenied,
    /// No fix could be obtained
    Unavailable,
    /// No fix arrived within the configured timeout
    Timeout,
}

impl PositionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
        }
    }
}

/// A non-fatal failure reported by a position source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionError {
    pub kind: PositionErrorKind,
    pub message: String,
}

impl PositionError {
    pub fn new(kind: PositionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.as_str())
    }
}

impl std::error::Error for PositionError {}

// ========== Trip Models ==========

/// Result of ending a tracking session, before the host assigns identity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripDraft {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub distance_km: f64,
    pub duration_s: u64,
}

/// Trip classification for bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    #[default]
    Unclassified,
    Work,
    Private,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Work => "work",
            Self::Private => "private",
        }
    }
}

impl std::str::FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unclassified" => Ok(Self::Unclassified),
            "work" => Ok(Self::Work),
            "private" => Ok(Self::Private),
            _ => Err(format!("Unknown trip type: {}", s)),
        }
    }
}

/// A trip as kept by the host's trip store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: i64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub distance_km: f64,
    pub duration_s: u64,
    #[serde(rename = "type", default)]
    pub trip_type: TripType,
    /// Logbook profile (e.g. a business line); None means the general profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_address: Option<String>,
}

impl TripRecord {
    /// Record a finished tracking session; new trips start unclassified
    pub fn from_draft(id: i64, draft: &TripDraft) -> Self {
        Self {
            id,
            start_time_ms: draft.start_time_ms,
            end_time_ms: draft.end_time_ms,
            distance_km: draft.distance_km,
            duration_s: draft.duration_s,
            trip_type: TripType::Unclassified,
            profile: None,
            start_address: None,
            end_address: None,
        }
    }

    /// Record a trip proposed by reconciliation
    pub fn from_proposed(id: i64, proposed: &ProposedTrip) -> Self {
        Self {
            id,
            start_time_ms: proposed.start_time_ms,
            end_time_ms: proposed.end_time_ms,
            distance_km: proposed.distance_km,
            duration_s: proposed.duration_s,
            trip_type: proposed.trip_type,
            profile: None,
            start_address: None,
            end_address: None,
        }
    }
}

/// Anything in trip history that reconciliation can match against
pub trait TripEndpoint {
    fn trip_id(&self) -> i64;
    fn end_time_ms(&self) -> i64;
}

impl TripEndpoint for TripRecord {
    fn trip_id(&self) -> i64 {
        self.id
    }

    fn end_time_ms(&self) -> i64 {
        self.end_time_ms
    }
}

// ========== Receipt Models ==========

/// Qualitative reliability of an extracted receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Score from the load-bearing fields only: date and total
    pub fn from_fields(has_date: bool, has_total: bool) -> Self {
        match (has_date, has_total) {
            (true, true) => Self::High,
            (true, false) | (false, true) => Self::Medium,
            (false, false) => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Fields recovered from recognized receipt text
///
/// Absent fields stay `None`; nothing is ever fabricated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReceipt {
    /// Purchase date as `dd.mm.yyyy`
    pub date: Option<String>,
    /// Purchase time as `HH:MM`
    pub time: Option<String>,
    pub store_name: Option<String>,
    /// True when the store name came from the caller's known vendor list
    #[serde(default)]
    pub matched_vendor: bool,
    /// Grand total as a decimal-comma amount, e.g. `45,90`
    pub total: Option<String>,
    pub confidence: Confidence,
    pub raw_text: String,
}

impl ExtractedReceipt {
    /// Numeric value of the total
    pub fn total_amount(&self) -> Option<f64> {
        self.total
            .as_deref()
            .and_then(|t| t.replace(' ', "").replace(',', ".").parse().ok())
    }

    /// Calendar date, or None if the extracted digits are not a real date
    pub fn naive_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%d.%m.%Y").ok())
    }

    pub fn naive_time(&self) -> Option<NaiveTime> {
        self.time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
    }

    /// Purchase instant in the given time zone, in epoch milliseconds
    pub fn timestamp_ms_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<i64> {
        let local = self.naive_date()?.and_time(self.naive_time()?);
        tz.from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    }

    /// Purchase instant in the device's local time zone
    pub fn local_timestamp_ms(&self) -> Option<i64> {
        self.timestamp_ms_in(&Local)
    }

    /// SHA-256 of the recognized text, used to spot duplicate scans
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.raw_text.as_bytes()))
    }

    /// Replace the date with a user-chosen one and re-score confidence
    pub fn with_date_override(mut self, date: NaiveDate) -> Self {
        self.date = Some(date.format("%d.%m.%Y").to_string());
        self.confidence = Confidence::from_fields(true, self.total.is_some());
        self
    }
}

// ========== Suggestion Models ==========

/// Kind of a reconciliation suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Classify,
    ProposedTrip,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::ProposedTrip => "proposed_trip",
        }
    }
}

/// A trip synthesized from a receipt when no recorded trip ends nearby
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProposedTrip {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    /// Unknown distance is recorded as 0
    pub distance_km: f64,
    pub duration_s: u64,
    #[serde(rename = "type")]
    pub trip_type: TripType,
}

/// What accepting a suggestion would do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionAction {
    /// Reclassify an existing trip that ended near the purchase
    Classify { target_trip_id: i64 },
    /// Insert a new trip ending at the purchase time
    ProposedTrip { proposed_trip: ProposedTrip },
}

/// Suggestion workflow status, driven by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for SuggestionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown suggestion status: {}", s)),
        }
    }
}

/// A user-reviewable outcome of reconciling one receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSuggestion {
    #[serde(flatten)]
    pub action: SuggestionAction,
    pub store_name: Option<String>,
    pub receipt_timestamp_ms: i64,
    /// Content hash of the receipt text this suggestion came from
    pub receipt_hash: String,
    #[serde(default)]
    pub status: SuggestionStatus,
}

impl ReconciliationSuggestion {
    pub fn kind(&self) -> SuggestionKind {
        match self.action {
            SuggestionAction::Classify { .. } => SuggestionKind::Classify,
            SuggestionAction::ProposedTrip { .. } => SuggestionKind::ProposedTrip,
        }
    }

    pub fn target_trip_id(&self) -> Option<i64> {
        match self.action {
            SuggestionAction::Classify { target_trip_id } => Some(target_trip_id),
            SuggestionAction::ProposedTrip { .. } => None,
        }
    }

    pub fn proposed_trip(&self) -> Option<&ProposedTrip> {
        match &self.action {
            SuggestionAction::Classify { .. } => None,
            SuggestionAction::ProposedTrip { proposed_trip } => Some(proposed_trip),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SuggestionStatus::Pending
    }

    pub fn accept(&mut self) -> Result<()> {
        self.transition(SuggestionStatus::Accepted)
    }

    pub fn reject(&mut self) -> Result<()> {
        self.transition(SuggestionStatus::Rejected)
    }

    fn transition(&mut self, to: SuggestionStatus) -> Result<()> {
        if !self.is_pending() {
            return Err(Error::InvalidState(format!(
                "suggestion already {}",
                self.status.as_str()
            )));
        }
        self.status = to;
        Ok(())
    }
}
