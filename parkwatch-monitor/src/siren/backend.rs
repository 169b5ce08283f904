//! Audio output abstraction.
//!
//! The siren never touches a sound device itself. An [`AudioBackend`]
//! stands in for the platform's synthesis primitives: an audio context
//! that starts suspended and must be unlocked by a user interaction, an
//! oscillator for tones and beeps, and a media element for clips.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

use super::pattern::{Beep, Tone};
use super::wav::WavClip;
use crate::api_client::types::SirenEvent;
use crate::tracing::prelude::*;

/// Where the render surface fetches the fallback clip from.
pub const CLIP_URL: &str = "/api/v0/siren/clip.wav";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created, but playback is blocked until unlocked.
    Suspended,
    Running,
    Closed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("audio context is not running")]
    NotRunning,
    #[error("audio context could not be created: {0}")]
    ContextUnavailable(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Create the audio context on first use and report its state.
    fn init_context(&self) -> Result<ContextState, AudioError>;

    /// Try to move a suspended context to running.
    async fn resume(&self) -> Result<ContextState, AudioError>;

    /// Record a user interaction that permits playback.
    fn unlock(&self) -> Result<(), AudioError>;

    fn is_unlocked(&self) -> bool;

    /// Current context state without creating it.
    fn context_state(&self) -> Option<ContextState>;

    fn play_tone(&self, tone: &Tone) -> Result<(), AudioError>;

    fn play_clip(&self, clip: &WavClip) -> Result<(), AudioError>;

    fn beep(&self, beep: &Beep) -> Result<(), AudioError>;

    /// The output side could not play the clip; later clip requests fail
    /// with `reason`.
    fn report_clip_failure(&self, reason: &str);

    /// Cut whatever is still sounding.
    fn silence(&self);
}

/// Audio backend that forwards sounds to the render surface as
/// [`SirenEvent`]s.
///
/// The context stays suspended until the surface reports a user
/// interaction through [`unlock`](AudioBackend::unlock), mirroring
/// browser autoplay rules. Clip playback happens on the surface, so a
/// clip failure only becomes visible once the surface reports it.
pub struct BroadcastAudio {
    context: Mutex<Option<ContextState>>,
    unlocked: AtomicBool,
    clip_failure: Mutex<Option<String>>,
    events: broadcast::Sender<SirenEvent>,
}

impl Default for BroadcastAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastAudio {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            context: Mutex::new(None),
            unlocked: AtomicBool::new(false),
            clip_failure: Mutex::new(None),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SirenEvent> {
        self.events.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<SirenEvent> {
        self.events.clone()
    }

    /// Events sent while no surface is connected are dropped.
    fn send(&self, event: SirenEvent) -> Result<(), AudioError> {
        if self.events.send(event).is_err() {
            trace!("No siren event listener");
        }
        Ok(())
    }
}

#[async_trait]
impl AudioBackend for BroadcastAudio {
    fn init_context(&self) -> Result<ContextState, AudioError> {
        let mut context = self.context.lock();
        let state = context.get_or_insert_with(|| {
            if self.unlocked.load(Ordering::Acquire) {
                ContextState::Running
            } else {
                ContextState::Suspended
            }
        });
        Ok(*state)
    }

    async fn resume(&self) -> Result<ContextState, AudioError> {
        let mut context = self.context.lock();
        match *context {
            None => Err(AudioError::NotRunning),
            Some(ContextState::Closed) => Ok(ContextState::Closed),
            Some(_) if self.unlocked.load(Ordering::Acquire) => {
                *context = Some(ContextState::Running);
                Ok(ContextState::Running)
            }
            Some(state) => Ok(state),
        }
    }

    fn unlock(&self) -> Result<(), AudioError> {
        self.unlocked.store(true, Ordering::Release);
        let mut context = self.context.lock();
        if context.is_some_and(|state| state == ContextState::Suspended) {
            *context = Some(ContextState::Running);
        }
        Ok(())
    }

    fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::Acquire)
    }

    fn context_state(&self) -> Option<ContextState> {
        *self.context.lock()
    }

    fn play_tone(&self, tone: &Tone) -> Result<(), AudioError> {
        if self.context_state() != Some(ContextState::Running) {
            return Err(AudioError::NotRunning);
        }
        self.send(SirenEvent::Tone {
            base_hz: tone.base_hz,
            peak_hz: tone.peak_hz,
            peak_gain: tone.peak_gain,
            attack_ms: tone.attack.as_millis() as u64,
            duration_ms: tone.duration.as_millis() as u64,
        })
    }

    fn play_clip(&self, clip: &WavClip) -> Result<(), AudioError> {
        if let Some(reason) = self.clip_failure.lock().clone() {
            return Err(AudioError::Playback(reason));
        }
        self.send(SirenEvent::Clip {
            url: CLIP_URL.to_string(),
            duration_ms: clip.duration().as_millis() as u64,
        })
    }

    fn beep(&self, beep: &Beep) -> Result<(), AudioError> {
        self.send(SirenEvent::Beep {
            frequency_hz: beep.frequency_hz,
            gain: beep.gain,
            duration_ms: beep.duration.as_millis() as u64,
        })
    }

    fn report_clip_failure(&self, reason: &str) {
        *self.clip_failure.lock() = Some(reason.to_string());
    }

    fn silence(&self) {
        let _ = self.send(SirenEvent::Silence);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::siren::SirenPattern;

    #[tokio::test]
    async fn context_starts_suspended_until_unlocked() {
        let audio = BroadcastAudio::new();
        assert_eq!(audio.context_state(), None);
        assert_eq!(audio.init_context().unwrap(), ContextState::Suspended);
        assert_eq!(audio.resume().await.unwrap(), ContextState::Suspended);
        assert!(!audio.is_unlocked());

        audio.unlock().unwrap();
        assert!(audio.is_unlocked());
        assert_eq!(audio.context_state(), Some(ContextState::Running));
        assert_eq!(audio.resume().await.unwrap(), ContextState::Running);
    }

    #[tokio::test]
    async fn unlock_before_first_use_creates_running_context() {
        let audio = BroadcastAudio::new();
        audio.unlock().unwrap();
        assert_eq!(audio.init_context().unwrap(), ContextState::Running);
    }

    #[test]
    fn tones_need_running_context() {
        let audio = BroadcastAudio::new();
        let _rx = audio.subscribe();
        let tone = SirenPattern::default().tones[0].clone();

        audio.init_context().unwrap();
        assert_eq!(audio.play_tone(&tone), Err(AudioError::NotRunning));

        audio.unlock().unwrap();
        assert_eq!(audio.play_tone(&tone), Ok(()));
    }

    #[test]
    fn forwards_events_to_subscribers() {
        let audio = BroadcastAudio::new();
        let mut rx = audio.subscribe();
        let clip = WavClip::new(1_000, vec![0; 500]);

        audio.play_clip(&clip).unwrap();
        audio.beep(&Beep::default()).unwrap();
        audio.silence();

        assert_eq!(
            rx.try_recv().unwrap(),
            SirenEvent::Clip {
                url: CLIP_URL.to_string(),
                duration_ms: 500
            }
        );
        assert!(matches!(rx.try_recv().unwrap(), SirenEvent::Beep { .. }));
        assert_eq!(rx.try_recv().unwrap(), SirenEvent::Silence);
    }

    #[test]
    fn reported_clip_failure_fails_later_clips() {
        let audio = BroadcastAudio::new();
        let mut rx = audio.subscribe();
        let clip = WavClip::new(1_000, vec![0; 500]);

        audio.report_clip_failure("media element blocked");
        assert_eq!(
            audio.play_clip(&clip),
            Err(AudioError::Playback("media element blocked".into()))
        );
        assert!(rx.try_recv().is_err());

        // beeps are unaffected
        audio.beep(&Beep::default()).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), SirenEvent::Beep { .. }));
    }

    #[test]
    fn playback_without_listener_is_dropped() {
        let audio = BroadcastAudio::new();
        assert_eq!(audio.beep(&Beep::default()), Ok(()));

        let mut rx = audio.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
