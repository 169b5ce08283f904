//! Command types sent from API handlers to the daemon's actors.
//!
//! Each command carries a oneshot reply channel so the handler can
//! await the result and translate it into an HTTP response.

use anyhow::Result;
use tokio::sync::oneshot;

use crate::api_client::types::PressKind;
use crate::risk::DiagnoseMap;

/// Commands from the API to the alarm controller.
pub enum AlarmCommand {
    /// A key press forwarded by the render surface. Also counts as the
    /// user interaction that unlocks audio.
    KeyPress {
        key: String,
        reply: oneshot::Sender<PressKind>,
    },

    /// A click or touch on the render surface; unlocks audio playback.
    UnlockAudio { reply: oneshot::Sender<Result<()>> },

    /// The render surface could not play the fallback clip.
    ClipFailed {
        reason: String,
        reply: oneshot::Sender<()>,
    },

    /// Silence the alarm, then ask the installation to decrease speed.
    /// Replies once the remote call has finished; the alarm is already
    /// silenced whatever the outcome.
    Acknowledge { reply: oneshot::Sender<Result<()>> },
}

/// Commands from the API to the telemetry poller.
pub enum TelemetryCommand {
    /// Run a diagnose scan now and re-evaluate with its result.
    RunDiagnose {
        reply: oneshot::Sender<Result<DiagnoseMap>>,
    },
}
