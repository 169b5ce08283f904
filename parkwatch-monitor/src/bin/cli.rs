//! Command-line interface for parkwatch.
//!
//! This binary provides a CLI for checking and operating the monitoring
//! daemon via the HTTP API.

use std::env;
use std::time::Duration;

use anyhow::Result;

use parkwatch_monitor::api_client;
use parkwatch_monitor::api_client::types::PressKind;

/// Gap between the two presses of `test-siren`; inside the double-press
/// window.
const TEST_PRESS_GAP: Duration = Duration::from_millis(150);

const DEFAULT_TEST_KEY: &str = "s";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "status" => cmd_status().await?,
        "ack" => cmd_ack().await?,
        "unlock" => cmd_unlock().await?,
        "test-siren" => {
            let key = args.get(2).map(String::as_str).unwrap_or(DEFAULT_TEST_KEY);
            cmd_test_siren(key).await?
        }
        "diagnose" => cmd_diagnose().await?,
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn usage() {
    eprintln!("Usage: parkwatch-cli <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status            Show alarm, risk and telemetry state");
    eprintln!("  ack               Silence the alarm and decrease speed");
    eprintln!("  unlock            Allow siren tone playback");
    eprintln!("  test-siren [KEY]  Double-press the test key (default: s)");
    eprintln!("  diagnose          Run a diagnose scan");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PARKWATCH_API_URL    API base URL (default: http://127.0.0.1:7786)");
}

/// Build an API client, honoring PARKWATCH_API_URL if set.
fn make_client() -> api_client::Client {
    match env::var("PARKWATCH_API_URL") {
        Ok(url) => api_client::Client::with_base_url(url),
        Err(_) => api_client::Client::new(),
    }
}

fn flag(set: bool) -> &'static str {
    if set { "YES" } else { "no" }
}

/// Print a summary of the current daemon state.
async fn cmd_status() -> Result<()> {
    let client = make_client();
    let alarm = client.get_alarm().await?;
    let risk = client.get_risk().await?;
    let telemetry = client.get_telemetry().await?;

    println!("Alarm:   {}", alarm.phase);
    println!(
        "Siren:   {} (loop {}, audio {})",
        alarm.audio.mode,
        if alarm.audio.loop_running { "running" } else { "stopped" },
        if alarm.audio.unlocked { "unlocked" } else { "locked" },
    );
    if let Some(notice) = &alarm.notice {
        println!("Notice:  {notice}");
    }

    println!("Risk:");
    println!("  temperature fault  {}", flag(risk.temp_fault));
    println!("  vibration fault    {}", flag(risk.vibration_fault));
    println!("  vibration alarm    {}", flag(risk.vibration_alarm));
    println!("  humidity fault     {}", flag(risk.humidity_fault));
    println!("  crack detected     {}", flag(risk.crack_detected));
    println!("  dirt detected      {}", flag(risk.dirt_detected));

    match &telemetry.latest {
        Some(sample) => {
            println!("Telemetry ({}):", if telemetry.connected { "connected" } else { "stale" });
            println!("  temperature  {:.1} °C", sample.temperature_c);
            println!("  vibration    {:.2} mm/s", sample.vibration_mm_per_sec);
            println!("  humidity     {:.1} %", sample.humidity_pct);
            println!("  battery      {:.2} V", sample.battery_v);
        }
        None => println!("Telemetry: (no readings yet)"),
    }
    if let Some(notice) = &telemetry.notice {
        println!("Notice:  {notice}");
    }

    Ok(())
}

async fn cmd_ack() -> Result<()> {
    let client = make_client();
    match client.acknowledge().await {
        Ok(()) => println!("Alarm silenced, speed decrease requested"),
        Err(e) => {
            // The daemon silences the alarm even when the remote call fails.
            println!("Alarm silenced");
            return Err(e.context("speed decrease failed"));
        }
    }
    Ok(())
}

async fn cmd_unlock() -> Result<()> {
    make_client().unlock().await?;
    println!("Audio unlocked");
    Ok(())
}

async fn cmd_test_siren(key: &str) -> Result<()> {
    let client = make_client();
    client.press_key(key).await?;
    tokio::time::sleep(TEST_PRESS_GAP).await;
    match client.press_key(key).await? {
        PressKind::Double => println!("Test siren triggered"),
        PressKind::Ignored => println!("'{key}' is not the test key"),
        other => println!("Press registered as {other}, siren not triggered"),
    }
    Ok(())
}

async fn cmd_diagnose() -> Result<()> {
    let map = make_client().diagnose().await?;

    if map.is_empty() {
        println!("Diagnose: (no inspection points)");
        return Ok(());
    }

    for (point, result) in &map {
        match &result.damage_report {
            Some(report) => println!(
                "{point}: {} (severity {}, triggered {})",
                report.type_of_damage.as_deref().unwrap_or("unknown damage"),
                report.severity.as_deref().unwrap_or("-"),
                report.triggered,
            ),
            None => println!("{point}: no damage report"),
        }
        if let Some(message) = &result.message {
            println!("  {message}");
        }
    }
    Ok(())
}
