//! Trip tracking command

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use triolog_core::{
    read_samples_csv, Clock, EngineConfig, PositionError, PositionErrorKind, ReplayClock,
    ReplaySource, SessionEvent, SessionSnapshot, SystemClock, TripDraft, TripSession,
};

use super::format_duration;
use crate::logbook::Logbook;

pub async fn cmd_track(
    logbook_path: &Path,
    config: &EngineConfig,
    replay: &Path,
    pace_ms: u64,
    profile: Option<String>,
) -> Result<()> {
    let mut logbook = Logbook::load(logbook_path)?;

    let file =
        File::open(replay).with_context(|| format!("Failed to open {}", replay.display()))?;
    let samples = read_samples_csv(file)
        .with_context(|| format!("Failed to read track {}", replay.display()))?;

    println!(
        "🚗 Tracking trip from {} ({} fixes)...",
        replay.display(),
        samples.len()
    );
    println!("   Press Ctrl-C to stop early");

    let name = replay
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "replay".to_string());
    let mut source = ReplaySource::from_samples(samples).with_name(name);
    if pace_ms > 0 {
        source = source.with_pace(Duration::from_millis(pace_ms));
    }

    // Trip times come from the recorded fixes, not the wall clock
    let start_ms = source.first_timestamp_ms().unwrap_or_else(|| SystemClock.now_ms());
    let clock = ReplayClock::starting_at(start_ms);
    source = source.with_clock(clock.clone());

    let mut session = TripSession::with_clock(config.tracking.clone(), clock);
    session
        .start(&source)
        .await
        .context("Failed to start tracking")?;

    let (draft, fatal) = drive_session(&mut session).await?;

    let trip_id = logbook.add_draft(&draft, profile);
    logbook.save(logbook_path)?;

    println!();
    println!("✅ Trip #{} recorded", trip_id);
    println!("   Distance: {:.2} km", draft.distance_km);
    println!("   Duration: {}", format_duration(draft.duration_s));
    println!("   Type:     unclassified");
    println!();
    println!(
        "   Classify it with: triolog trips classify {} work",
        trip_id
    );

    if let Some(error) = fatal {
        return Err(triolog_core::Error::from(error))
            .context("Location access was revoked; trip saved up to that point");
    }

    Ok(())
}

/// Run the session until the track ends, Ctrl-C, or location access is revoked
///
/// The session is always stopped before returning. A permission error is
/// handed back so the caller can report it after saving the trip.
pub async fn drive_session(
    session: &mut TripSession,
) -> Result<(TripDraft, Option<PositionError>)> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut fatal = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                println!("⏹  Stopped by user");
                break;
            }
            event = session.next_event() => match event {
                Some(SessionEvent::Moved { verdict, snapshot }) => {
                    if verdict.is_accepted() {
                        print_live(&snapshot);
                    }
                }
                Some(SessionEvent::Tick(snapshot)) => print_live(&snapshot),
                Some(SessionEvent::PositionError(error)) => {
                    println!();
                    println!("⚠️  {}", error);
                    if error.kind == PositionErrorKind::PermissionDenied {
                        fatal = Some(error);
                        break;
                    }
                }
                Some(SessionEvent::SourceClosed) | None => break,
            }
        }
    }

    let draft = session.stop().context("Failed to stop tracking")?;
    Ok((draft, fatal))
}

fn print_live(snapshot: &SessionSnapshot) {
    print!(
        "\r   📍 {:>8.2} km   ⏱  {}",
        snapshot.distance_km,
        format_duration(snapshot.duration_s)
    );
    let _ = std::io::stdout().flush();
}
