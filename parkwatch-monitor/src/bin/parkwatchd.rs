//! Monitoring daemon.
//!
//! Polls the telemetry backend, runs the alarm and siren, and serves the
//! render-surface API until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use parkwatch_monitor::alarm::AlarmController;
use parkwatch_monitor::api::{self, SharedState};
use parkwatch_monitor::api_client::types::{AlarmSnapshot, RiskState, TelemetrySnapshot};
use parkwatch_monitor::backend::{Backend, HttpBackend};
use parkwatch_monitor::config::MonitorConfig;
use parkwatch_monitor::siren::{
    BroadcastAudio, CLIP_SAMPLE_RATE, SirenPattern, SirenPlayer, SirenSounds, WavClip,
};
use parkwatch_monitor::telemetry::TelemetryPoller;
use parkwatch_monitor::tracing::{self, prelude::*};

const COMMAND_QUEUE: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init();

    let config = MonitorConfig::from_env()?;
    info!(
        backend = %config.backend_url,
        profile = %config.profile,
        api = %config.api_addr,
        "Starting parkwatchd"
    );

    let backend: Arc<dyn Backend> =
        Arc::new(HttpBackend::new(&config.backend_url, config.request_timeout)?);

    let pattern = SirenPattern::default();
    let clip = WavClip::from_pattern(&pattern, CLIP_SAMPLE_RATE);
    let siren_clip = clip.encode();
    let audio = Arc::new(BroadcastAudio::new());
    let siren_events = audio.sender();
    let siren = SirenPlayer::new(audio, SirenSounds::new(pattern, clip));

    let (telemetry_cmd_tx, telemetry_cmd_rx) = mpsc::channel(COMMAND_QUEUE);
    let (alarm_cmd_tx, alarm_cmd_rx) = mpsc::channel(COMMAND_QUEUE);
    let (telemetry_tx, telemetry_rx) = watch::channel(TelemetrySnapshot::default());
    let (risk_tx, risk_rx) = watch::channel(RiskState::default());
    let (alarm_tx, alarm_rx) = watch::channel(AlarmSnapshot::default());

    let poller = TelemetryPoller::new(
        backend.clone(),
        config.evaluator(),
        config.fast_poll,
        config.slow_poll,
        telemetry_cmd_rx,
        telemetry_tx,
        risk_tx,
    );
    let controller = AlarmController::new(
        siren,
        backend,
        config.test_key.clone(),
        risk_rx.clone(),
        alarm_cmd_rx,
        alarm_tx,
    );
    let state = SharedState {
        alarm_cmd_tx,
        telemetry_cmd_tx,
        alarm_rx,
        risk_rx,
        telemetry_rx,
        siren_events,
        siren_clip,
    };

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();
    tracker.spawn(poller.run(shutdown.clone()));
    tracker.spawn(controller.run(shutdown.clone()));

    let server = tracker.spawn(api::serve(config.api_addr, state, shutdown.clone()));
    tracker.close();

    tokio::select! {
        _ = shutdown_signal() => {}
        result = server => {
            // Bind failures end up here.
            match result {
                Ok(Err(e)) => error!(error = %e, "API server exited"),
                Err(e) => error!(error = %e, "API server task failed"),
                Ok(Ok(())) => {}
            }
        }
    }

    shutdown.cancel();
    tracker.wait().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
