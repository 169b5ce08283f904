//! API data transfer objects.
//!
//! These types define the contract between the daemon and the render
//! surface (dashboard, CLI). Components publish them directly on their
//! watch channels.

use serde::{Deserialize, Serialize};
use strum::Display;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Flags derived from the latest telemetry and diagnose scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct RiskState {
    pub temp_fault: bool,
    pub vibration_fault: bool,
    pub vibration_alarm: bool,
    pub crack_detected: bool,
    pub dirt_detected: bool,
    pub humidity_fault: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlarmPhase {
    #[default]
    Armed,
    Triggered,
    Active,
}

/// Which siren path is currently sounding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SirenMode {
    #[default]
    Silent,
    /// Oscillator tone sweeps.
    Tones,
    /// Encoded WAV clip.
    Clip,
    /// Single-oscillator beep.
    Beep,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct AudioStatus {
    /// False until a user interaction unlocks playback. The render
    /// surface should prompt for a click while this is false.
    pub unlocked: bool,
    pub mode: SirenMode,
    pub loop_running: bool,
}

/// Alarm state snapshot for banners, flash overlay and unlock prompt.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct AlarmSnapshot {
    pub triggered: bool,
    pub active: bool,
    pub flashing: bool,
    pub phase: AlarmPhase,
    pub audio: AudioStatus,
    /// User-visible message, e.g. a failed decrease-speed command.
    pub notice: Option<String>,
}

/// Latest combined sensor reading. Missing values read as zero.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct MetricSample {
    pub temperature_c: f64,
    pub vibration_mm_per_sec: f64,
    pub humidity_pct: f64,
    pub battery_v: f64,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub captured_at: OffsetDateTime,
}

/// Telemetry as seen by the poller, with trailing chart windows.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct TelemetrySnapshot {
    pub connected: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_fetch: Option<OffsetDateTime>,
    pub latest: Option<MetricSample>,
    pub temperature: Vec<f64>,
    pub vibration: Vec<f64>,
    pub humidity: Vec<f64>,
    pub battery: Vec<f64>,
    pub notice: Option<String>,
}

/// Classification of a forwarded key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PressKind {
    /// Not the designated test key.
    Ignored,
    /// Too close to the previous press; contact bounce.
    Bounce,
    Single,
    Double,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct KeyPressRequest {
    pub key: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct KeyPressResponse {
    pub kind: PressKind,
}

/// Sent by a render surface whose media element rejected the clip.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ClipFailureRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

/// Sound requests streamed to the render surface, which owns the
/// actual audio device.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SirenEvent {
    Tone {
        base_hz: f32,
        peak_hz: f32,
        peak_gain: f32,
        attack_ms: u64,
        duration_ms: u64,
    },
    Clip {
        url: String,
        duration_ms: u64,
    },
    Beep {
        frequency_hz: f32,
        gain: f32,
        duration_ms: u64,
    },
    /// Stop anything still sounding.
    Silence,
}
