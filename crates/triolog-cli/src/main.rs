//! TrioLog CLI - Driving logbook
//!
//! Usage:
//!   triolog init                      Create an empty logbook
//!   triolog track --replay track.csv  Record a trip from a position track
//!   triolog scan --file receipt.txt   Extract a receipt and suggest a trip
//!   triolog report --type work        Summarize the logbook

mod cli;
mod commands;
mod logbook;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.logbook),
        Commands::Track {
            replay,
            pace_ms,
            profile,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_track(&cli.logbook, &config, &replay, pace_ms, profile).await
        }
        Commands::Trips { action } => match action {
            None => commands::cmd_trips_list(&cli.logbook, 20),
            Some(TripsAction::List { limit }) => commands::cmd_trips_list(&cli.logbook, limit),
            Some(TripsAction::Classify { id, trip_type }) => {
                commands::cmd_trips_classify(&cli.logbook, id, &trip_type)
            }
            Some(TripsAction::Delete { id }) => commands::cmd_trips_delete(&cli.logbook, id),
        },
        Commands::Scan {
            file,
            date,
            no_reconcile,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_scan(&cli.logbook, &config, &file, date.as_deref(), no_reconcile)
        }
        Commands::Suggestions { action } => match action {
            None => commands::cmd_suggestions_list(&cli.logbook, false),
            Some(SuggestionsAction::List { all }) => {
                commands::cmd_suggestions_list(&cli.logbook, all)
            }
            Some(SuggestionsAction::Accept { id }) => {
                commands::cmd_suggestions_accept(&cli.logbook, id)
            }
            Some(SuggestionsAction::Reject { id }) => {
                commands::cmd_suggestions_reject(&cli.logbook, id)
            }
        },
        Commands::Report {
            trip_type,
            profile,
            from,
            to,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_report(
                &cli.logbook,
                &config,
                trip_type.as_deref(),
                profile,
                from.as_deref(),
                to.as_deref(),
            )
        }
    }
}
