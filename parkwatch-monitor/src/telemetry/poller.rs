//! Telemetry polling actor.
//!
//! Owns the backend client and the trailing windows. Temperature and
//! vibration refresh on the fast interval, humidity and battery on the
//! slow one, and diagnose scans run on demand. After every update the
//! evaluator runs again and the resulting [`RiskState`] is published.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::parse::or_zero;
use super::window::MetricWindow;
use crate::api::commands::TelemetryCommand;
use crate::api_client::types::{MetricSample, RiskState, TelemetrySnapshot};
use crate::backend::Backend;
use crate::risk::{DiagnoseMap, ThresholdEvaluator};
use crate::tracing::prelude::*;

#[derive(Debug, Clone, Copy, Default)]
struct Readings {
    temperature_c: f64,
    vibration_mm_per_sec: f64,
    humidity_pct: f64,
    battery_v: f64,
}

pub struct TelemetryPoller {
    backend: Arc<dyn Backend>,
    evaluator: ThresholdEvaluator,
    fast_poll: Duration,
    slow_poll: Duration,
    command_rx: mpsc::Receiver<TelemetryCommand>,
    snapshot_tx: watch::Sender<TelemetrySnapshot>,
    risk_tx: watch::Sender<RiskState>,

    readings: Readings,
    captured_at: Option<OffsetDateTime>,
    temperature: MetricWindow,
    vibration: MetricWindow,
    humidity: MetricWindow,
    battery: MetricWindow,
    diagnose: DiagnoseMap,
    metrics_error: Option<String>,
    environment_error: Option<String>,
}

impl TelemetryPoller {
    pub fn new(
        backend: Arc<dyn Backend>,
        evaluator: ThresholdEvaluator,
        fast_poll: Duration,
        slow_poll: Duration,
        command_rx: mpsc::Receiver<TelemetryCommand>,
        snapshot_tx: watch::Sender<TelemetrySnapshot>,
        risk_tx: watch::Sender<RiskState>,
    ) -> Self {
        Self {
            backend,
            evaluator,
            fast_poll,
            slow_poll,
            command_rx,
            snapshot_tx,
            risk_tx,
            readings: Readings::default(),
            captured_at: None,
            temperature: MetricWindow::default(),
            vibration: MetricWindow::default(),
            humidity: MetricWindow::default(),
            battery: MetricWindow::default(),
            diagnose: DiagnoseMap::new(),
            metrics_error: None,
            environment_error: None,
        }
    }

    pub async fn run(mut self, cancellation: CancellationToken) {
        let mut fast = tokio::time::interval(self.fast_poll);
        fast.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut slow = tokio::time::interval(self.slow_poll);
        slow.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            fast_secs = self.fast_poll.as_secs(),
            slow_secs = self.slow_poll.as_secs(),
            "Telemetry poller started"
        );

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                _ = fast.tick() => self.poll_metrics().await,
                _ = slow.tick() => self.poll_environment().await,
                Some(command) = self.command_rx.recv() => self.handle_command(command).await,
            }
        }

        debug!("Telemetry poller stopped");
    }

    async fn handle_command(&mut self, command: TelemetryCommand) {
        match command {
            TelemetryCommand::RunDiagnose { reply } => {
                let result = match self.backend.run_diagnose().await {
                    Ok(map) => {
                        info!(points = map.len(), "Diagnose scan complete");
                        self.diagnose = map.clone();
                        self.publish();
                        Ok(map)
                    }
                    Err(e) => {
                        warn!(error = %e, "Diagnose scan failed");
                        Err(anyhow::Error::new(e).context("diagnose scan failed"))
                    }
                };
                let _ = reply.send(result);
            }
        }
    }

    async fn poll_metrics(&mut self) {
        match self.backend.fetch_metrics().await {
            Ok(records) => {
                if self.metrics_error.take().is_some() {
                    info!("Metrics feed reachable again");
                }
                // An empty feed leaves the latest reading and its windows alone.
                if let Some(latest) = records.last() {
                    self.readings.temperature_c = or_zero(latest.temperature);
                    self.readings.vibration_mm_per_sec = or_zero(latest.vibration);
                    self.captured_at = Some(OffsetDateTime::now_utc());
                    self.temperature
                        .refill(records.iter().map(|r| or_zero(r.temperature)));
                    self.vibration
                        .refill(records.iter().map(|r| or_zero(r.vibration)));
                }
                debug!(
                    records = records.len(),
                    temp_c = %self.readings.temperature_c,
                    vibration = %self.readings.vibration_mm_per_sec,
                    "Metrics polled"
                );
            }
            Err(e) => {
                warn!(error = %e, "Metrics poll failed");
                self.metrics_error = Some(e.to_string());
            }
        }
        self.publish();
    }

    async fn poll_environment(&mut self) {
        match self.backend.fetch_environment().await {
            Ok(records) => {
                if self.environment_error.take().is_some() {
                    info!("Environment feed reachable again");
                }
                if let Some(latest) = records.last() {
                    self.readings.humidity_pct = or_zero(latest.humidity);
                    self.readings.battery_v = or_zero(latest.battery_v);
                    self.captured_at = Some(OffsetDateTime::now_utc());
                    self.humidity
                        .refill(records.iter().map(|r| or_zero(r.humidity)));
                    self.battery
                        .refill(records.iter().map(|r| or_zero(r.battery_v)));
                }
                debug!(
                    records = records.len(),
                    humidity_pct = %self.readings.humidity_pct,
                    battery_v = %self.readings.battery_v,
                    "Environment polled"
                );
            }
            Err(e) => {
                warn!(error = %e, "Environment poll failed");
                self.environment_error = Some(e.to_string());
            }
        }
        self.publish();
    }

    fn latest_sample(&self) -> Option<MetricSample> {
        self.captured_at.map(|captured_at| MetricSample {
            temperature_c: self.readings.temperature_c,
            vibration_mm_per_sec: self.readings.vibration_mm_per_sec,
            humidity_pct: self.readings.humidity_pct,
            battery_v: self.readings.battery_v,
            captured_at,
        })
    }

    fn publish(&self) {
        let latest = self.latest_sample();
        let risk = self.evaluator.evaluate(latest.as_ref(), &self.diagnose);

        let notice = self
            .metrics_error
            .as_ref()
            .or(self.environment_error.as_ref())
            .map(|e| format!("Telemetry backend unreachable: {e}"));

        self.snapshot_tx.send_replace(TelemetrySnapshot {
            connected: notice.is_none() && latest.is_some(),
            last_fetch: latest.as_ref().map(|s| s.captured_at),
            latest,
            temperature: self.temperature.to_vec(),
            vibration: self.vibration.to_vec(),
            humidity: self.humidity.to_vec(),
            battery: self.battery.to_vec(),
            notice,
        });

        self.risk_tx.send_if_modified(|current| {
            if *current == risk {
                return false;
            }
            info!(
                previous = ?*current,
                new = ?risk,
                "Risk state changed"
            );
            *current = risk;
            true
        });
    }
}
