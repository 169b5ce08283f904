//! Replay recorded sensor captures through the alarm engine.
//!
//! Reads a CSV capture, evaluates every row against a threshold profile
//! and prints where risk flags change and where the alarm would have
//! sounded or cleared.

mod capture;
mod timeline;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use parkwatch_monitor::alarm::Transition;
use parkwatch_monitor::risk::{ThresholdEvaluator, ThresholdProfile};
use parkwatch_monitor::siren::{CLIP_SAMPLE_RATE, SirenPattern, WavClip};
use parkwatch_monitor::tracing::prelude::*;

use timeline::{EventKind, TimelineEvent};

#[derive(Parser, Debug)]
#[command(name = "parkwatch-replay")]
#[command(about = "Replay a sensor capture through the parkwatch alarm engine")]
struct Args {
    /// CSV capture with time,temperature,vibration[,humidity] columns
    capture: Option<PathBuf>,

    /// Threshold profile (structural, ambient, legacy)
    #[arg(short, long, default_value_t = ThresholdProfile::Structural)]
    profile: ThresholdProfile,

    /// Override the vibration alarm threshold (mm/s)
    #[arg(long)]
    vibration_alarm: Option<f64>,

    /// Write the synthesized fallback siren clip to this path
    #[arg(long, value_name = "PATH")]
    siren_wav: Option<PathBuf>,

    /// Only print alarm transitions
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    if let Some(path) = &args.siren_wav {
        write_siren_clip(path)?;
    }

    let Some(capture_path) = &args.capture else {
        if args.siren_wav.is_none() {
            anyhow::bail!("nothing to do: pass a capture file and/or --siren-wav");
        }
        return Ok(());
    };

    let mut thresholds = args.profile.thresholds();
    if let Some(limit) = args.vibration_alarm {
        thresholds.vibration_alarm_mm_s = limit;
    }
    thresholds.validate()?;
    let evaluator = ThresholdEvaluator::new(thresholds, "A1", "B1");

    let readings = capture::read_capture_file(capture_path)?;
    debug!(rows = readings.len(), profile = %args.profile, "Capture loaded");

    let (events, summary) = timeline::replay(&readings, &evaluator);
    for event in &events {
        if args.quiet && matches!(event.kind, EventKind::Risk(_)) {
            continue;
        }
        println!("{}", format_event(event));
    }

    println!();
    println!(
        "{} readings, {} alarm activation(s), peak vibration {:.2} mm/s{}",
        summary.readings,
        summary.activations,
        summary.peak_vibration,
        if summary.active_at_end {
            ", alarm still active at end"
        } else {
            ""
        }
    );

    Ok(())
}

fn format_event(event: &TimelineEvent) -> String {
    let prefix = format!(
        "#{:<5} {:<24} {:>7.2} mm/s",
        event.row, event.time, event.vibration_mm_per_sec
    );
    let detail = match &event.kind {
        EventKind::Risk(flags) if flags.is_empty() => "risk   nominal".dimmed().to_string(),
        EventKind::Risk(flags) => format!("risk   {}", flags.join(", ")).yellow().to_string(),
        EventKind::Alarm(Transition::Activated(cause)) => {
            format!("ALARM  activated ({cause:?})").red().bold().to_string()
        }
        EventKind::Alarm(Transition::Cleared(cause)) => {
            format!("alarm  cleared ({cause:?})").green().to_string()
        }
    };
    format!("{} {}", prefix.dimmed(), detail)
}

fn write_siren_clip(path: &Path) -> Result<()> {
    let clip = WavClip::from_pattern(&SirenPattern::default(), CLIP_SAMPLE_RATE);
    fs::write(path, clip.encode()).with_context(|| format!("cannot write {}", path.display()))?;
    info!(path = %path.display(), duration_ms = clip.duration().as_millis() as u64, "Siren clip written");
    eprintln!(
        "Wrote {:.1} s siren clip to {}",
        clip.duration().as_secs_f32(),
        path.display()
    );
    Ok(())
}
