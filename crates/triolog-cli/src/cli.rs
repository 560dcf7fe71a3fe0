//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// TrioLog - Driving logbook with receipt reconciliation
#[derive(Parser)]
#[command(name = "triolog")]
#[command(about = "Driving logbook: trip tracking and receipt reconciliation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Logbook file path
    #[arg(long, default_value = "triolog.json", global = true)]
    pub logbook: PathBuf,

    /// Config file (defaults to ~/.config/triolog/config.toml, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty logbook
    Init,

    /// Track a trip from a recorded position track
    Track {
        /// CSV file with latitude,longitude,timestamp_ms columns; the trip's
        /// start and end times follow the recorded timestamps
        #[arg(short, long)]
        replay: PathBuf,

        /// Delay between fixes in milliseconds (0 replays as fast as possible)
        #[arg(long, default_value = "0")]
        pace_ms: u64,

        /// Logbook profile for the recorded trip
        #[arg(long)]
        profile: Option<String>,
    },

    /// Manage trips (list, classify, delete)
    Trips {
        #[command(subcommand)]
        action: Option<TripsAction>,
    },

    /// Scan recognized receipt text and reconcile it against trips
    Scan {
        /// Text file produced by OCR
        #[arg(short, long)]
        file: PathBuf,

        /// Purchase date to use instead of the one on the receipt (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Only extract fields, do not create a suggestion
        #[arg(long)]
        no_reconcile: bool,
    },

    /// Review reconciliation suggestions
    Suggestions {
        #[command(subcommand)]
        action: Option<SuggestionsAction>,
    },

    /// Show logbook summary and mileage compensation
    Report {
        /// Only trips of this type: work, private, unclassified
        #[arg(short = 't', long = "type")]
        trip_type: Option<String>,

        /// Only trips in this profile
        #[arg(long)]
        profile: Option<String>,

        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TripsAction {
    /// List trips
    List {
        /// Maximum number of trips to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Set a trip's type
    Classify {
        /// Trip ID
        id: i64,
        /// New type: work, private, unclassified
        trip_type: String,
    },
    /// Delete a trip
    Delete {
        /// Trip ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SuggestionsAction {
    /// List suggestions
    List {
        /// Include accepted and rejected suggestions
        #[arg(long)]
        all: bool,
    },
    /// Accept a suggestion and apply it to the trips
    Accept {
        /// Suggestion ID
        id: i64,
    },
    /// Reject a suggestion
    Reject {
        /// Suggestion ID
        id: i64,
    },
}
