//! Client side of the telemetry backend.

mod http;
pub mod wire;

use async_trait::async_trait;

pub use http::HttpBackend;
use wire::{EnvironmentRecord, MetricRecord};

use crate::error::Result;
use crate::risk::DiagnoseMap;

/// Operations the daemon needs from the telemetry backend.
///
/// Feeds come back oldest first; the last record is the latest reading.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Temperature/vibration feed.
    async fn fetch_metrics(&self) -> Result<Vec<MetricRecord>>;

    /// Humidity/battery feed.
    async fn fetch_environment(&self) -> Result<Vec<EnvironmentRecord>>;

    /// Run a diagnose scan over the inspection points.
    async fn run_diagnose(&self) -> Result<DiagnoseMap>;

    /// Ask the installation to slow down. Any success status counts.
    async fn decrease_speed(&self) -> Result<()>;
}
