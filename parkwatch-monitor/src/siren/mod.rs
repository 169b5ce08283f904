//! Audible alarm output.
//!
//! [`SirenPlayer`] runs the siren loop against an [`AudioBackend`]. The
//! daemon uses [`BroadcastAudio`], which turns every sound into a
//! [`SirenEvent`](crate::api_client::types::SirenEvent) for the render
//! surface, and serves the pre-rendered [`WavClip`] for the clip
//! fallback.

mod backend;
mod pattern;
mod player;
mod wav;

pub use backend::{AudioBackend, AudioError, BroadcastAudio, CLIP_URL, ContextState};
pub use pattern::{Beep, SirenPattern, Tone};
pub use player::{SirenPlayer, SirenSounds};
pub use wav::{CLIP_SAMPLE_RATE, WavClip};

#[cfg(test)]
pub(crate) use backend::testing;
