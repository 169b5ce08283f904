//! API v0 endpoints.
//!
//! Version 0 signals an unstable API -- breaking changes are expected
//! while the dashboard contract settles.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::commands::{AlarmCommand, TelemetryCommand};
use super::server::SharedState;
use crate::api_client::types::{
    AlarmSnapshot, ClipFailureRequest, ErrorBody, KeyPressRequest, KeyPressResponse, RiskState,
    SirenEvent, TelemetrySnapshot,
};
use crate::risk::{DiagnoseMap, InspectionPoint};
use crate::tracing::prelude::*;

/// Longest a handler waits for an actor to answer. Covers a
/// decrease-speed or diagnose round trip to the backend.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the v0 API routes with OpenAPI metadata.
pub fn routes() -> OpenApiRouter<SharedState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(get_telemetry))
        .routes(routes!(get_risk))
        .routes(routes!(get_alarm))
        .routes(routes!(post_keypress))
        .routes(routes!(post_unlock))
        .routes(routes!(post_acknowledge))
        .routes(routes!(post_diagnose))
        .routes(routes!(get_siren_clip))
        .routes(routes!(get_siren_events))
        .routes(routes!(post_siren_clip_failed))
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "daemon component is not responding".into(),
        }
    }

    fn bad_gateway(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: format!("{error:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// Send a command to an actor and wait for its reply.
async fn send_command<C, T>(
    tx: &mpsc::Sender<C>,
    command: impl FnOnce(oneshot::Sender<T>) -> C,
) -> Result<T, ApiError> {
    let (reply, rx) = oneshot::channel();
    tx.send(command(reply))
        .await
        .map_err(|_| ApiError::unavailable())?;
    // Result layers: timeout / channel-closed.
    let Ok(Ok(value)) = tokio::time::timeout(COMMAND_TIMEOUT, rx).await else {
        return Err(ApiError::unavailable());
    };
    Ok(value)
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = OK, description = "Server is running", body = String),
    ),
)]
async fn health() -> &'static str {
    "OK"
}

/// Latest sample, trailing windows and backend connection state.
#[utoipa::path(
    get,
    path = "/telemetry",
    tag = "telemetry",
    responses(
        (status = OK, description = "Telemetry snapshot", body = TelemetrySnapshot),
    ),
)]
async fn get_telemetry(State(state): State<SharedState>) -> Json<TelemetrySnapshot> {
    Json(state.telemetry())
}

#[utoipa::path(
    get,
    path = "/risk",
    tag = "telemetry",
    responses(
        (status = OK, description = "Current risk flags", body = RiskState),
    ),
)]
async fn get_risk(State(state): State<SharedState>) -> Json<RiskState> {
    Json(state.risk())
}

#[utoipa::path(
    get,
    path = "/alarm",
    tag = "alarm",
    responses(
        (status = OK, description = "Alarm and audio state", body = AlarmSnapshot),
    ),
)]
async fn get_alarm(State(state): State<SharedState>) -> Json<AlarmSnapshot> {
    Json(state.alarm())
}

/// Forward a key press. A double press of the test key sounds the siren.
#[utoipa::path(
    post,
    path = "/alarm/keypress",
    tag = "alarm",
    request_body = KeyPressRequest,
    responses(
        (status = OK, description = "How the press was classified", body = KeyPressResponse),
        (status = SERVICE_UNAVAILABLE, description = "Alarm controller not responding", body = ErrorBody),
    ),
)]
async fn post_keypress(
    State(state): State<SharedState>,
    Json(req): Json<KeyPressRequest>,
) -> Result<Json<KeyPressResponse>, ApiError> {
    let kind = send_command(&state.alarm_cmd_tx, |reply| AlarmCommand::KeyPress {
        key: req.key,
        reply,
    })
    .await?;
    Ok(Json(KeyPressResponse { kind }))
}

/// Report a user interaction so the siren may use tone playback.
#[utoipa::path(
    post,
    path = "/alarm/unlock",
    tag = "alarm",
    responses(
        (status = NO_CONTENT, description = "Audio unlocked"),
        (status = BAD_GATEWAY, description = "Audio backend refused", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Alarm controller not responding", body = ErrorBody),
    ),
)]
async fn post_unlock(State(state): State<SharedState>) -> Result<StatusCode, ApiError> {
    send_command(&state.alarm_cmd_tx, |reply| AlarmCommand::UnlockAudio {
        reply,
    })
    .await?
    .map_err(ApiError::bad_gateway)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Silence the alarm and send the decrease-speed command.
///
/// The alarm is silenced even when the remote command fails.
#[utoipa::path(
    post,
    path = "/alarm/acknowledge",
    tag = "alarm",
    responses(
        (status = NO_CONTENT, description = "Alarm silenced, speed decrease accepted"),
        (status = BAD_GATEWAY, description = "Alarm silenced, speed decrease failed", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Alarm controller not responding", body = ErrorBody),
    ),
)]
async fn post_acknowledge(State(state): State<SharedState>) -> Result<StatusCode, ApiError> {
    send_command(&state.alarm_cmd_tx, |reply| AlarmCommand::Acknowledge {
        reply,
    })
    .await?
    .map_err(ApiError::bad_gateway)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run a diagnose scan and return its result per inspection point.
#[utoipa::path(
    post,
    path = "/diagnose",
    tag = "telemetry",
    responses(
        (status = OK, description = "Scan result", body = BTreeMap<String, InspectionPoint>),
        (status = BAD_GATEWAY, description = "Backend scan failed", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Telemetry poller not responding", body = ErrorBody),
    ),
)]
async fn post_diagnose(State(state): State<SharedState>) -> Result<Json<DiagnoseMap>, ApiError> {
    let map = send_command(&state.telemetry_cmd_tx, |reply| {
        TelemetryCommand::RunDiagnose { reply }
    })
    .await?
    .map_err(ApiError::bad_gateway)?;
    Ok(Json(map))
}

/// Report that the fallback clip could not be played. The siren drops
/// to single-oscillator beeps.
#[utoipa::path(
    post,
    path = "/siren/clip-failed",
    tag = "siren",
    request_body = ClipFailureRequest,
    responses(
        (status = NO_CONTENT, description = "Siren will fall back to beeps"),
        (status = SERVICE_UNAVAILABLE, description = "Alarm controller not responding", body = ErrorBody),
    ),
)]
async fn post_siren_clip_failed(
    State(state): State<SharedState>,
    Json(req): Json<ClipFailureRequest>,
) -> Result<StatusCode, ApiError> {
    send_command(&state.alarm_cmd_tx, |reply| AlarmCommand::ClipFailed {
        reason: req.reason,
        reply,
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Software-rendered siren for surfaces without tone synthesis.
#[utoipa::path(
    get,
    path = "/siren/clip.wav",
    tag = "siren",
    responses(
        (status = OK, description = "16-bit mono PCM WAV", content_type = "audio/wav"),
    ),
)]
async fn get_siren_clip(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "audio/wav")],
        state.siren_clip.clone(),
    )
}

/// Stream of sounds the render surface should play.
#[utoipa::path(
    get,
    path = "/siren/events",
    tag = "siren",
    responses(
        (status = OK, description = "Server-sent siren events", body = SirenEvent, content_type = "text/event-stream"),
    ),
)]
async fn get_siren_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream =
        BroadcastStream::new(state.siren_events.subscribe()).filter_map(|event| match event {
            Ok(event) => Event::default().json_data(&event).ok().map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                debug!(skipped, "Siren event subscriber lagged");
                None
            }
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use tokio::sync::{broadcast, watch};
    use tower::ServiceExt;

    use super::*;
    use crate::api::build_router;
    use crate::api_client::types::PressKind;
    use crate::risk::DamageReport;
    use crate::siren::{SirenPattern, WavClip};

    struct Fixture {
        state: SharedState,
        alarm_cmd_rx: mpsc::Receiver<AlarmCommand>,
        telemetry_cmd_rx: mpsc::Receiver<TelemetryCommand>,
        risk_tx: watch::Sender<RiskState>,
        _alarm_tx: watch::Sender<AlarmSnapshot>,
        _telemetry_tx: watch::Sender<TelemetrySnapshot>,
    }

    fn fixture() -> Fixture {
        let (alarm_cmd_tx, alarm_cmd_rx) = mpsc::channel(4);
        let (telemetry_cmd_tx, telemetry_cmd_rx) = mpsc::channel(4);
        let (alarm_tx, alarm_rx) = watch::channel(AlarmSnapshot::default());
        let (risk_tx, risk_rx) = watch::channel(RiskState::default());
        let (telemetry_tx, telemetry_rx) = watch::channel(TelemetrySnapshot::default());
        let (siren_events, _) = broadcast::channel(8);
        let clip = WavClip::from_pattern(&SirenPattern::default(), 8_000);

        Fixture {
            state: SharedState {
                alarm_cmd_tx,
                telemetry_cmd_tx,
                alarm_rx,
                risk_rx,
                telemetry_rx,
                siren_events,
                siren_clip: clip.encode(),
            },
            alarm_cmd_rx,
            telemetry_cmd_rx,
            risk_tx,
            _alarm_tx: alarm_tx,
            _telemetry_tx: telemetry_tx,
        }
    }

    async fn call(
        state: &SharedState,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, Bytes) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let f = fixture();
        let (status, body) = call(&f.state, "GET", "/api/v0/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn risk_reflects_latest_evaluation() {
        let f = fixture();
        f.risk_tx.send_replace(RiskState {
            vibration_fault: true,
            vibration_alarm: true,
            ..Default::default()
        });

        let (status, body) = call(&f.state, "GET", "/api/v0/risk", None).await;
        assert_eq!(status, StatusCode::OK);
        let risk: RiskState = serde_json::from_slice(&body).unwrap();
        assert!(risk.vibration_alarm);
        assert!(!risk.temp_fault);
    }

    #[tokio::test]
    async fn alarm_and_telemetry_snapshots_are_served() {
        let f = fixture();

        let (status, body) = call(&f.state, "GET", "/api/v0/alarm", None).await;
        assert_eq!(status, StatusCode::OK);
        let alarm: AlarmSnapshot = serde_json::from_slice(&body).unwrap();
        assert!(!alarm.active);
        assert!(!alarm.audio.unlocked);

        let (status, body) = call(&f.state, "GET", "/api/v0/telemetry", None).await;
        assert_eq!(status, StatusCode::OK);
        let telemetry: TelemetrySnapshot = serde_json::from_slice(&body).unwrap();
        assert!(!telemetry.connected);
    }

    #[tokio::test]
    async fn keypress_is_forwarded() {
        let f = fixture();
        let mut commands = f.alarm_cmd_rx;
        tokio::spawn(async move {
            if let Some(AlarmCommand::KeyPress { key, reply }) = commands.recv().await {
                assert_eq!(key, "s");
                let _ = reply.send(PressKind::Double);
            }
        });

        let (status, body) =
            call(&f.state, "POST", "/api/v0/alarm/keypress", Some(r#"{"key":"s"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let response: KeyPressResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.kind, PressKind::Double);
    }

    #[tokio::test]
    async fn failed_acknowledge_is_bad_gateway() {
        let f = fixture();
        let mut commands = f.alarm_cmd_rx;
        tokio::spawn(async move {
            if let Some(AlarmCommand::Acknowledge { reply }) = commands.recv().await {
                let _ = reply.send(Err(anyhow::anyhow!("backend returned 500")));
            }
        });

        let (status, body) = call(&f.state, "POST", "/api/v0/alarm/acknowledge", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(error.message.contains("500"));
    }

    #[tokio::test]
    async fn unlock_returns_no_content() {
        let f = fixture();
        let mut commands = f.alarm_cmd_rx;
        tokio::spawn(async move {
            if let Some(AlarmCommand::UnlockAudio { reply }) = commands.recv().await {
                let _ = reply.send(Ok(()));
            }
        });

        let (status, _) = call(&f.state, "POST", "/api/v0/alarm/unlock", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn clip_failure_is_forwarded() {
        let f = fixture();
        let mut commands = f.alarm_cmd_rx;
        let forwarded = tokio::spawn(async move {
            match commands.recv().await {
                Some(AlarmCommand::ClipFailed { reason, reply }) => {
                    let _ = reply.send(());
                    Some(reason)
                }
                _ => None,
            }
        });

        let (status, _) = call(
            &f.state,
            "POST",
            "/api/v0/siren/clip-failed",
            Some(r#"{"reason":"NotAllowedError"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(forwarded.await.unwrap().as_deref(), Some("NotAllowedError"));
    }

    #[tokio::test]
    async fn dropped_reply_is_unavailable() {
        let f = fixture();
        let mut commands = f.alarm_cmd_rx;
        tokio::spawn(async move {
            // Receive and drop without answering.
            let _ = commands.recv().await;
        });

        let (status, _) = call(&f.state, "POST", "/api/v0/alarm/unlock", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn diagnose_returns_scan() {
        let f = fixture();
        let mut commands = f.telemetry_cmd_rx;
        tokio::spawn(async move {
            if let Some(TelemetryCommand::RunDiagnose { reply }) = commands.recv().await {
                let map = DiagnoseMap::from([(
                    "B1".to_string(),
                    InspectionPoint {
                        damage_report: Some(DamageReport {
                            type_of_damage: Some("Surface dirt".into()),
                            ..Default::default()
                        }),
                        message: None,
                    },
                )]);
                let _ = reply.send(Ok(map));
            }
        });

        let (status, body) = call(&f.state, "POST", "/api/v0/diagnose", None).await;
        assert_eq!(status, StatusCode::OK);
        let map: DiagnoseMap = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            map["B1"].damage_report.as_ref().unwrap().type_of_damage.as_deref(),
            Some("Surface dirt")
        );
    }

    #[tokio::test]
    async fn siren_clip_is_wav() {
        let f = fixture();
        let request = Request::builder()
            .uri("/api/v0/siren/clip.wav")
            .body(Body::empty())
            .unwrap();

        let response = build_router(f.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..4], b"RIFF");
        assert_eq!(body, f.state.siren_clip);
    }

    #[tokio::test]
    async fn siren_events_stream_as_sse() {
        let f = fixture();
        let request = Request::builder()
            .uri("/api/v0/siren/events")
            .body(Body::empty())
            .unwrap();

        let response = build_router(f.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

        f.state
            .siren_events
            .send(SirenEvent::Beep {
                frequency_hz: 880.0,
                gain: 0.2,
                duration_ms: 200,
            })
            .unwrap();

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.starts_with("data: "));
        assert!(text.contains(r#""kind":"beep""#));
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let f = fixture();
        let (status, body) = call(&f.state, "GET", "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/api/v0/alarm/acknowledge"].is_object());
        assert!(doc["paths"]["/api/v0/siren/events"].is_object());
    }
}
