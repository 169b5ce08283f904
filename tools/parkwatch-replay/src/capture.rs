//! CSV sensor captures.
//!
//! Expected header: `time,temperature,vibration` with an optional
//! `humidity` column. Values may carry units ("3.48 mm/s"); anything
//! that does not start with a number reads as zero, same as the daemon.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use parkwatch_monitor::telemetry::parse::{or_zero, parse_reading};

/// One capture row after lenient parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// 1-based data row, header excluded.
    pub row: usize,
    pub time: String,
    pub temperature_c: f64,
    pub vibration_mm_per_sec: f64,
    pub humidity_pct: f64,
}

#[derive(Debug, Deserialize)]
struct CaptureRow {
    #[serde(default)]
    time: String,
    #[serde(default)]
    temperature: Option<String>,
    #[serde(default)]
    vibration: Option<String>,
    #[serde(default)]
    humidity: Option<String>,
}

fn reading(field: Option<&str>) -> f64 {
    or_zero(field.and_then(parse_reading))
}

pub fn read_capture<R: io::Read>(input: R) -> Result<Vec<Reading>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut readings = Vec::new();
    for (index, row) in reader.deserialize::<CaptureRow>().enumerate() {
        let row_number = index + 1;
        let row = row.with_context(|| format!("malformed capture row {row_number}"))?;
        readings.push(Reading {
            row: row_number,
            time: row.time,
            temperature_c: reading(row.temperature.as_deref()),
            vibration_mm_per_sec: reading(row.vibration.as_deref()),
            humidity_pct: reading(row.humidity.as_deref()),
        });
    }
    Ok(readings)
}

pub fn read_capture_file(path: &Path) -> Result<Vec<Reading>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    read_capture(file)
}
