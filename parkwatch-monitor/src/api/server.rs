//! HTTP server hosting the render-surface API.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use super::commands::{AlarmCommand, TelemetryCommand};
use super::v0;
use crate::api_client::types::{AlarmSnapshot, RiskState, SirenEvent, TelemetrySnapshot};
use crate::tracing::prelude::*;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "parkwatch",
        description = "Alarm, risk and telemetry state for the monitoring dashboard"
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "telemetry", description = "Sensor readings and diagnose scans"),
        (name = "alarm", description = "Alarm state and operator actions"),
        (name = "siren", description = "Siren audio for the render surface"),
    )
)]
struct ApiDoc;

/// State shared by all handlers. Cloned per request.
#[derive(Clone)]
pub struct SharedState {
    pub alarm_cmd_tx: mpsc::Sender<AlarmCommand>,
    pub telemetry_cmd_tx: mpsc::Sender<TelemetryCommand>,
    pub alarm_rx: watch::Receiver<AlarmSnapshot>,
    pub risk_rx: watch::Receiver<RiskState>,
    pub telemetry_rx: watch::Receiver<TelemetrySnapshot>,
    pub siren_events: broadcast::Sender<SirenEvent>,
    /// Encoded fallback clip served at `/siren/clip.wav`.
    pub siren_clip: Bytes,
}

impl SharedState {
    pub fn alarm(&self) -> AlarmSnapshot {
        self.alarm_rx.borrow().clone()
    }

    pub fn risk(&self) -> RiskState {
        *self.risk_rx.borrow()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry_rx.borrow().clone()
    }
}

pub fn build_router(state: SharedState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/v0", v0::routes())
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled.
pub async fn serve(addr: SocketAddr, state: SharedState, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind API server to {addr}"))?;
    info!(%addr, "API server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("API server failed")?;

    debug!("API server stopped");
    Ok(())
}
