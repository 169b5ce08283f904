//! Fallback siren clip: mono 16-bit PCM in a RIFF/WAVE container.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use super::pattern::SirenPattern;

pub const CLIP_SAMPLE_RATE: u32 = 22_050;

const HEADER_LEN: usize = 44;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const PCM_FORMAT: u16 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct WavClip {
    sample_rate: u32,
    samples: Vec<i16>,
}

impl WavClip {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Render the siren pattern in software.
    pub fn from_pattern(pattern: &SirenPattern, sample_rate: u32) -> Self {
        let samples = pattern
            .render(sample_rate)
            .into_iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();
        Self::new(sample_rate, samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Encode as a complete `.wav` file.
    pub fn encode(&self) -> Bytes {
        let data_len = (self.samples.len() * 2) as u32;
        let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
        let byte_rate = self.sample_rate * block_align as u32;

        let mut buf = BytesMut::with_capacity(HEADER_LEN + data_len as usize);
        buf.put_slice(b"RIFF");
        buf.put_u32_le(36 + data_len);
        buf.put_slice(b"WAVE");

        buf.put_slice(b"fmt ");
        buf.put_u32_le(16);
        buf.put_u16_le(PCM_FORMAT);
        buf.put_u16_le(CHANNELS);
        buf.put_u32_le(self.sample_rate);
        buf.put_u32_le(byte_rate);
        buf.put_u16_le(block_align);
        buf.put_u16_le(BITS_PER_SAMPLE);

        buf.put_slice(b"data");
        buf.put_u32_le(data_len);
        for sample in &self.samples {
            buf.put_i16_le(*sample);
        }

        buf.freeze()
    }
}
