//! Logbook file
//!
//! Trips, reconciliation suggestions and remembered vendor names, kept in a
//! single JSON document. Saves go through a temp file in the same directory
//! and are renamed into place, so a crash never leaves a half-written logbook.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use triolog_core::{ReconciliationSuggestion, SuggestionAction, TripDraft, TripRecord, TripType};

/// A suggestion as stored, with the id the user refers to it by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSuggestion {
    pub id: i64,
    #[serde(flatten)]
    pub suggestion: ReconciliationSuggestion,
}

/// What accepting a suggestion did to the trips
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    Classified { trip_id: i64 },
    Inserted { trip_id: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Logbook {
    #[serde(default)]
    pub trips: Vec<TripRecord>,
    #[serde(default)]
    pub suggestions: Vec<StoredSuggestion>,
    /// Store names confirmed by accepting a suggestion
    #[serde(default)]
    pub vendors: Vec<String>,
}

impl Logbook {
    /// Create a new, empty logbook file; fails if one already exists
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            bail!("Logbook already exists at {}", path.display());
        }
        let logbook = Self::default();
        logbook.save(path)?;
        Ok(logbook)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "No logbook at {}. Run `triolog init` first.",
                path.display()
            );
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read logbook {}", path.display()))?;
        let logbook: Self = serde_json::from_str(&content)
            .with_context(|| format!("Logbook {} is not valid", path.display()))?;
        debug!(
            path = %path.display(),
            trips = logbook.trips.len(),
            suggestions = logbook.suggestions.len(),
            "logbook loaded"
        );
        Ok(logbook)
    }

    /// Write atomically: temp file in the target directory, then rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let json = serde_json::to_string_pretty(self).context("Failed to serialize logbook")?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write logbook")?;
        tmp.as_file().sync_all().context("Failed to flush logbook")?;
        tmp.persist(path)
            .map_err(|e| anyhow!("Failed to replace {}: {}", path.display(), e.error))?;
        debug!(path = %path.display(), "logbook saved");
        Ok(())
    }

    // ========== Trips ==========

    fn next_trip_id(&self) -> i64 {
        self.trips.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    pub fn add_draft(&mut self, draft: &TripDraft, profile: Option<String>) -> i64 {
        let id = self.next_trip_id();
        let mut trip = TripRecord::from_draft(id, draft);
        trip.profile = profile;
        self.trips.push(trip);
        id
    }

    pub fn trip(&self, id: i64) -> Option<&TripRecord> {
        self.trips.iter().find(|t| t.id == id)
    }

    pub fn classify_trip(&mut self, id: i64, trip_type: TripType) -> Result<()> {
        let trip = self
            .trips
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow!("Trip {} not found", id))?;
        trip.trip_type = trip_type;
        Ok(())
    }

    pub fn delete_trip(&mut self, id: i64) -> Result<TripRecord> {
        let pos = self
            .trips
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| anyhow!("Trip {} not found", id))?;
        Ok(self.trips.remove(pos))
    }

    /// Trips newest first
    pub fn recent_trips(&self, limit: usize) -> Vec<&TripRecord> {
        let mut trips: Vec<&TripRecord> = self.trips.iter().collect();
        trips.sort_by(|a, b| b.start_time_ms.cmp(&a.start_time_ms));
        trips.truncate(limit);
        trips
    }

    // ========== Suggestions ==========

    /// Whether a suggestion already exists for this receipt text
    pub fn has_receipt(&self, receipt_hash: &str) -> bool {
        self.suggestions
            .iter()
            .any(|s| s.suggestion.receipt_hash == receipt_hash)
    }

    pub fn add_suggestion(&mut self, suggestion: ReconciliationSuggestion) -> i64 {
        let id = self.suggestions.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        self.suggestions.push(StoredSuggestion { id, suggestion });
        id
    }

    pub fn suggestion(&self, id: i64) -> Option<&StoredSuggestion> {
        self.suggestions.iter().find(|s| s.id == id)
    }

    fn suggestion_mut(&mut self, id: i64) -> Result<&mut ReconciliationSuggestion> {
        self.suggestions
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| &mut s.suggestion)
            .ok_or_else(|| anyhow!("Suggestion {} not found", id))
    }

    /// Accept a pending suggestion and apply its effect
    ///
    /// A classify suggestion marks its target trip as work; a proposed trip is
    /// inserted. The store name is remembered as a known vendor.
    pub fn accept_suggestion(&mut self, id: i64) -> Result<Applied> {
        let suggestion = self.suggestion_mut(id)?.clone();
        if !suggestion.is_pending() {
            bail!(
                "Suggestion {} is already {}",
                id,
                suggestion.status.as_str()
            );
        }

        let applied = match &suggestion.action {
            SuggestionAction::Classify { target_trip_id } => {
                self.classify_trip(*target_trip_id, TripType::Work)
                    .with_context(|| format!("Cannot apply suggestion {}", id))?;
                Applied::Classified {
                    trip_id: *target_trip_id,
                }
            }
            SuggestionAction::ProposedTrip { proposed_trip } => {
                let trip_id = self.next_trip_id();
                let mut trip = TripRecord::from_proposed(trip_id, proposed_trip);
                trip.end_address = suggestion.store_name.clone();
                self.trips.push(trip);
                Applied::Inserted { trip_id }
            }
        };

        self.suggestion_mut(id)?.accept()?;
        if let Some(store) = &suggestion.store_name {
            self.remember_vendor(store);
        }
        Ok(applied)
    }

    pub fn reject_suggestion(&mut self, id: i64) -> Result<()> {
        self.suggestion_mut(id)?.reject()?;
        Ok(())
    }

    fn remember_vendor(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.vendors.iter().any(|v| v.eq_ignore_ascii_case(name)) {
            self.vendors.push(name.to_string());
        }
    }
}
