//! Engine configuration
//!
//! Tunables for tracking, receipt extraction, reconciliation and reporting.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path (`--config`), or the override in the platform config
//!    dir (~/.config/triolog/config.toml) if it exists
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::DEFAULT_MIN_MOVEMENT_KM;
use crate::models::TripType;
use crate::position::SamplingOptions;
use crate::receipts::ReceiptCatalog;
use crate::reconcile::ReconciliationConfig;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/triolog.toml");

/// Upper bound for reconciliation durations (one week)
const MAX_RECONCILIATION_MINUTES: i64 = 7 * 24 * 60;

/// Tracking session settings
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Minimum distance from the anchor for a sample to count as movement
    pub min_movement_km: f64,
    /// Duration clock period
    pub tick_interval: Duration,
    /// Sampling request handed to the position source
    pub sampling: SamplingOptions,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_movement_km: DEFAULT_MIN_MOVEMENT_KM,
            tick_interval: Duration::from_secs(1),
            sampling: SamplingOptions::default(),
        }
    }
}

/// Extra catalog entries merged into the built-in receipt tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptsConfig {
    pub extra_stores: Vec<String>,
    pub extra_total_keywords: Vec<String>,
    pub extra_currency_symbols: Vec<String>,
}

/// Logbook report settings
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// Compensation per work kilometer
    pub km_rate: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { km_rate: 0.59 }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub tracking: TrackingConfig,
    pub reconciliation: ReconciliationConfig,
    pub receipts: ReceiptsConfig,
    pub report: ReportConfig,
}

impl EngineConfig {
    /// Load from the default override location, else the embedded defaults
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from an explicit path (which must exist), else as [`Self::load`]
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::NotFound(format!(
                        "config file {}",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "loading config override");
                read_config(path)?
            }
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => {
                    debug!(path = %default_path.display(), "loading config override");
                    read_config(&default_path)?
                }
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::from_toml(&content)
    }

    /// Parse a TOML document on top of the built-in defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// Receipt catalog with configured extras appended
    pub fn receipt_catalog(&self) -> ReceiptCatalog {
        ReceiptCatalog::default()
            .with_stores(self.receipts.extra_stores.iter().cloned())
            .with_total_keywords(self.receipts.extra_total_keywords.iter().cloned())
            .with_currency_symbols(self.receipts.extra_currency_symbols.iter().cloned())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("triolog").join("config.toml"))
}

fn read_config(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    tracking: Option<RawTracking>,
    reconciliation: Option<RawReconciliation>,
    receipts: Option<RawReceipts>,
    report: Option<RawReport>,
}

#[derive(Debug, Deserialize)]
struct RawTracking {
    min_movement_m: Option<f64>,
    tick_interval_ms: Option<u64>,
    sampling: Option<RawSampling>,
}

#[derive(Debug, Deserialize)]
struct RawSampling {
    high_accuracy: Option<bool>,
    timeout_secs: Option<u64>,
    maximum_age_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawReconciliation {
    match_window_minutes: Option<i64>,
    proposed_drive_minutes: Option<i64>,
    default_trip_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReceipts {
    extra_stores: Option<Vec<String>>,
    extra_total_keywords: Option<Vec<String>>,
    extra_currency_symbols: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    km_rate: Option<f64>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = EngineConfig::default();

    if let Some(tracking) = raw.tracking {
        if let Some(meters) = tracking.min_movement_m {
            if !meters.is_finite() || meters < 0.0 {
                return Err(Error::Config(format!(
                    "tracking.min_movement_m must be >= 0, got {}",
                    meters
                )));
            }
            config.tracking.min_movement_km = meters / 1000.0;
        }
        if let Some(ms) = tracking.tick_interval_ms {
            // The duration display must refresh at least once per second
            if ms == 0 || ms > 1000 {
                return Err(Error::Config(format!(
                    "tracking.tick_interval_ms must be in 1..=1000, got {}",
                    ms
                )));
            }
            config.tracking.tick_interval = Duration::from_millis(ms);
        }
        if let Some(sampling) = tracking.sampling {
            if let Some(high_accuracy) = sampling.high_accuracy {
                config.tracking.sampling.high_accuracy = high_accuracy;
            }
            if let Some(timeout) = sampling.timeout_secs {
                config.tracking.sampling.timeout = Duration::from_secs(timeout);
            }
            if let Some(max_age) = sampling.maximum_age_secs {
                config.tracking.sampling.maximum_age = Duration::from_secs(max_age);
            }
        }
    }

    if let Some(reconciliation) = raw.reconciliation {
        if let Some(minutes) = reconciliation.match_window_minutes {
            config.reconciliation.match_window =
                reconciliation_minutes("match_window_minutes", minutes, 0)?;
        }
        if let Some(minutes) = reconciliation.proposed_drive_minutes {
            config.reconciliation.proposed_drive =
                reconciliation_minutes("proposed_drive_minutes", minutes, 1)?;
        }
        if let Some(trip_type) = reconciliation.default_trip_type {
            config.reconciliation.default_trip_type = trip_type
                .parse::<TripType>()
                .map_err(|e| Error::Config(format!("reconciliation.default_trip_type: {}", e)))?;
        }
    }

    if let Some(receipts) = raw.receipts {
        if let Some(stores) = receipts.extra_stores {
            config.receipts.extra_stores = stores;
        }
        if let Some(keywords) = receipts.extra_total_keywords {
            config.receipts.extra_total_keywords = keywords;
        }
        if let Some(symbols) = receipts.extra_currency_symbols {
            config.receipts.extra_currency_symbols = symbols;
        }
    }

    if let Some(report) = raw.report {
        if let Some(rate) = report.km_rate {
            config.report.km_rate = rate;
        }
    }

    Ok(config)
}

/// Validate a `[reconciliation]` minute count in `min..=MAX_RECONCILIATION_MINUTES`
fn reconciliation_minutes(key: &str, minutes: i64, min: i64) -> Result<chrono::Duration> {
    if !(min..=MAX_RECONCILIATION_MINUTES).contains(&minutes) {
        return Err(Error::Config(format!(
            "reconciliation.{} must be in {}..={}, got {}",
            key, min, MAX_RECONCILIATION_MINUTES, minutes
        )));
    }
    chrono::Duration::try_minutes(minutes).ok_or_else(|| {
        Error::Config(format!("reconciliation.{} is out of range: {}", key, minutes))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.tracking.min_movement_km, 0.005);
        assert_eq!(config.tracking.sampling.timeout, Duration::from_secs(15));
        assert_eq!(
            config.reconciliation.match_window,
            chrono::Duration::minutes(30)
        );
        assert_eq!(config.reconciliation.default_trip_type, TripType::Work);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [reconciliation]
            match_window_minutes = 45

            [receipts]
            extra_stores = ["Kesko Kenkä"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.reconciliation.match_window,
            chrono::Duration::minutes(45)
        );
        assert_eq!(
            config.reconciliation.proposed_drive,
            chrono::Duration::minutes(15)
        );
        assert_eq!(config.tracking, TrackingConfig::default());
        assert_eq!(config.receipts.extra_stores, vec!["Kesko Kenkä"]);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_toml("[tracking]\ntick_interval_ms = 5000"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[tracking]\nmin_movement_m = -1.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[reconciliation]\ndefault_trip_type = \"leisure\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[reconciliation]\nproposed_drive_minutes = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("not toml ["),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_huge_reconciliation_minutes_rejected() {
        assert!(matches!(
            EngineConfig::from_toml("[reconciliation]\nmatch_window_minutes = 9000000000000000000"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[reconciliation]\nproposed_drive_minutes = 9000000000000000000"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("[reconciliation]\nmatch_window_minutes = -5"),
            Err(Error::Config(_))
        ));

        // A full week is still accepted
        let config =
            EngineConfig::from_toml("[reconciliation]\nproposed_drive_minutes = 10080").unwrap();
        assert_eq!(config.reconciliation.proposed_drive, chrono::Duration::weeks(1));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[report]\nkm_rate = 0.25").unwrap();

        let config = EngineConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.report.km_rate, 0.25);
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            EngineConfig::load_from(Some(&missing)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_receipt_catalog_includes_extras() {
        let config = EngineConfig::from_toml(
            r#"
            [receipts]
            extra_stores = ["Kesko Kenkä"]
            extra_total_keywords = ["loppusumma"]
            extra_currency_symbols = ["EUR"]
            "#,
        )
        .unwrap();

        let catalog = config.receipt_catalog();
        assert!(catalog.stores().iter().any(|s| s == "Kesko Kenkä"));
        assert!(catalog.total_keywords().iter().any(|k| k == "loppusumma"));
        assert!(catalog.currency_symbols().iter().any(|c| c == "EUR"));
        assert!(catalog.currency_symbols().iter().any(|c| c == "€"));
    }
}
