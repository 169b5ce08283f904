//! The siren loop.
//!
//! At most one loop runs at a time. The loop is a single task that owns
//! a [`CancellationToken`]; it checks the token at the top of every
//! iteration and again right before each tone, so stopping mid-pattern
//! silences the tones that have not started yet.
//!
//! Output escalates on failure and never propagates errors:
//!
//! ```text
//!  Tones (context running, every 5 s)
//!    │ context stays suspended / oscillator fails
//!    ▼
//!  Clip  (WAV clip, every 3 s) ──► upgrades back to Tones once unlocked
//!    │ clip playback fails
//!    ▼
//!  Beep  (single oscillator, every 1 s)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::backend::{AudioBackend, AudioError, ContextState};
use super::pattern::{Beep, SirenPattern};
use super::wav::WavClip;
use crate::api_client::types::SirenMode;
use crate::tracing::prelude::*;

const CLIP_PERIOD: Duration = Duration::from_secs(3);
const BEEP_PERIOD: Duration = Duration::from_secs(1);

/// Sounds and repeat periods for each escalation level.
#[derive(Debug, Clone)]
pub struct SirenSounds {
    pub pattern: SirenPattern,
    pub clip: WavClip,
    pub clip_period: Duration,
    pub beep: Beep,
    pub beep_period: Duration,
}

impl SirenSounds {
    pub fn new(pattern: SirenPattern, clip: WavClip) -> Self {
        Self {
            pattern,
            clip,
            clip_period: CLIP_PERIOD,
            beep: Beep::default(),
            beep_period: BEEP_PERIOD,
        }
    }
}

/// Ownership token of the running loop.
struct LoopHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Mode updates from one loop. Dropped once that loop has been stopped,
/// so a loop still winding down cannot overwrite its successor's mode.
struct ModePublisher {
    tx: Arc<watch::Sender<SirenMode>>,
    generation: Arc<AtomicU64>,
    own: u64,
}

impl ModePublisher {
    fn publish(&self, mode: SirenMode) {
        self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::Acquire) != self.own || *current == mode {
                return false;
            }
            *current = mode;
            true
        });
    }
}

pub struct SirenPlayer {
    backend: Arc<dyn AudioBackend>,
    sounds: Arc<SirenSounds>,
    mode_tx: Arc<watch::Sender<SirenMode>>,
    /// Bumped on every stop, under the mode channel's lock.
    generation: Arc<AtomicU64>,
    running: Option<LoopHandle>,
}

impl SirenPlayer {
    pub fn new(backend: Arc<dyn AudioBackend>, sounds: SirenSounds) -> Self {
        let (mode_tx, _) = watch::channel(SirenMode::Silent);
        Self {
            backend,
            sounds: Arc::new(sounds),
            mode_tx: Arc::new(mode_tx),
            generation: Arc::new(AtomicU64::new(0)),
            running: None,
        }
    }

    /// Start the loop as a child of `parent`. Returns false, doing
    /// nothing, if a loop is already running.
    pub fn start(&mut self, parent: &CancellationToken) -> bool {
        if self.is_running() {
            debug!("Siren loop already running");
            return false;
        }

        let token = parent.child_token();
        let publisher = ModePublisher {
            tx: self.mode_tx.clone(),
            generation: self.generation.clone(),
            own: self.generation.load(Ordering::Acquire),
        };
        let task = tokio::spawn(siren_loop(
            self.backend.clone(),
            self.sounds.clone(),
            publisher,
            token.clone(),
        ));
        self.running = Some(LoopHandle { token, task });
        true
    }

    /// Cancel the loop. Tones not yet started will not sound, and the
    /// mode reads `Silent` as soon as this returns.
    pub fn stop(&mut self) {
        if let Some(handle) = self.running.take() {
            handle.token.cancel();
            self.mode_tx.send_modify(|mode| {
                self.generation.fetch_add(1, Ordering::AcqRel);
                *mode = SirenMode::Silent;
            });
            self.backend.silence();
            debug!("Siren loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|h| !h.token.is_cancelled() && !h.task.is_finished())
    }

    /// Forward a user interaction that permits audio playback.
    pub fn unlock(&self) -> Result<(), AudioError> {
        self.backend.unlock()
    }

    pub fn is_unlocked(&self) -> bool {
        self.backend.is_unlocked()
    }

    /// Forward a clip playback failure from the render surface. A loop
    /// in clip mode drops to beeps on its next iteration.
    pub fn report_clip_failure(&self, reason: &str) {
        self.backend.report_clip_failure(reason);
    }

    pub fn mode(&self) -> SirenMode {
        *self.mode_tx.borrow()
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<SirenMode> {
        self.mode_tx.subscribe()
    }
}

impl Drop for SirenPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn siren_loop(
    backend: Arc<dyn AudioBackend>,
    sounds: Arc<SirenSounds>,
    publisher: ModePublisher,
    token: CancellationToken,
) {
    let mut mode = initial_mode(backend.as_ref()).await;
    // Tones are not retried after an oscillator failure.
    let mut tones_failed = false;
    publisher.publish(mode);
    info!(mode = %mode, "Siren loop started");

    loop {
        if token.is_cancelled() {
            break;
        }
        let iteration_start = Instant::now();

        if mode != SirenMode::Tones
            && !tones_failed
            && backend.context_state() == Some(ContextState::Running)
        {
            info!(from = %mode, "Audio unlocked, switching siren to tones");
            mode = SirenMode::Tones;
            publisher.publish(mode);
        }

        let period = match mode {
            SirenMode::Tones => match play_pattern(backend.as_ref(), &sounds.pattern, &token).await
            {
                Ok(()) => sounds.pattern.period,
                Err(e) => {
                    warn!(error = %e, "Siren tones failed, falling back to clip");
                    tones_failed = true;
                    mode = SirenMode::Clip;
                    publisher.publish(mode);
                    continue;
                }
            },
            SirenMode::Clip => match backend.play_clip(&sounds.clip) {
                Ok(()) => sounds.clip_period,
                Err(e) => {
                    warn!(error = %e, "Siren clip failed, falling back to beep");
                    mode = SirenMode::Beep;
                    publisher.publish(mode);
                    continue;
                }
            },
            SirenMode::Beep | SirenMode::Silent => {
                if let Err(e) = backend.beep(&sounds.beep) {
                    debug!(error = %e, "Siren beep failed");
                }
                sounds.beep_period
            }
        };

        tokio::select! {
            _ = token.cancelled() => break,
            _ = sleep_until(iteration_start + period) => {}
        }
    }

    publisher.publish(SirenMode::Silent);
    debug!("Siren loop exited");
}

/// Lazily create the context and try to get it running.
async fn initial_mode(backend: &dyn AudioBackend) -> SirenMode {
    let state = match backend.init_context() {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "Audio context unavailable");
            return SirenMode::Clip;
        }
    };

    let state = if state == ContextState::Suspended {
        match backend.resume().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Audio context resume failed");
                state
            }
        }
    } else {
        state
    };

    if state == ContextState::Running {
        SirenMode::Tones
    } else {
        info!("Audio context suspended, waiting for user unlock");
        SirenMode::Clip
    }
}

async fn play_pattern(
    backend: &dyn AudioBackend,
    pattern: &SirenPattern,
    token: &CancellationToken,
) -> Result<(), AudioError> {
    let start = Instant::now();
    for tone in &pattern.tones {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = sleep_until(start + tone.offset) => {}
        }
        if token.is_cancelled() {
            return Ok(());
        }
        backend.play_tone(tone)?;
    }
    Ok(())
}
