use std::f32::consts::TAU;
use std::time::Duration;

/// Gain the decay envelope ends at; close enough to silence.
const DECAY_FLOOR: f32 = 0.001;

/// One swept tone of the siren pattern.
///
/// Frequency ramps linearly from `base_hz` to `peak_hz` over the first
/// half of the tone and back over the second half. Gain ramps linearly
/// to `peak_gain` during `attack`, then decays exponentially.
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    /// Start time relative to the beginning of the pattern.
    pub offset: Duration,
    pub duration: Duration,
    pub attack: Duration,
    pub base_hz: f32,
    pub peak_hz: f32,
    pub peak_gain: f32,
}

impl Tone {
    pub fn frequency_at(&self, t: Duration) -> f32 {
        let half = self.duration.as_secs_f32() / 2.0;
        if half <= 0.0 {
            return self.base_hz;
        }
        let t = t.as_secs_f32().min(self.duration.as_secs_f32());
        let progress = if t <= half {
            t / half
        } else {
            (2.0 * half - t) / half
        };
        self.base_hz + (self.peak_hz - self.base_hz) * progress
    }

    pub fn gain_at(&self, t: Duration) -> f32 {
        if t >= self.duration {
            return 0.0;
        }
        if t < self.attack {
            return self.peak_gain * t.as_secs_f32() / self.attack.as_secs_f32();
        }

        let decay = (self.duration - self.attack).as_secs_f32();
        if decay <= 0.0 || self.peak_gain <= DECAY_FLOOR {
            return self.peak_gain;
        }
        let progress = (t - self.attack).as_secs_f32() / decay;
        self.peak_gain * (DECAY_FLOOR / self.peak_gain).powf(progress)
    }

    pub fn end(&self) -> Duration {
        self.offset + self.duration
    }
}

/// The repeating siren: overlapping tones, restarted every `period`.
#[derive(Debug, Clone, PartialEq)]
pub struct SirenPattern {
    pub tones: Vec<Tone>,
    pub period: Duration,
}

impl Default for SirenPattern {
    fn default() -> Self {
        let sweep = |index: u64, base_hz: f32, peak_hz: f32| Tone {
            offset: Duration::from_millis(500 * index),
            duration: Duration::from_millis(1000),
            attack: Duration::from_millis(50),
            base_hz,
            peak_hz,
            peak_gain: 0.3,
        };

        Self {
            tones: vec![
                sweep(0, 800.0, 1600.0),
                sweep(1, 900.0, 1800.0),
                sweep(2, 800.0, 1600.0),
                sweep(3, 900.0, 1800.0),
            ],
            period: Duration::from_secs(5),
        }
    }
}

impl SirenPattern {
    /// Time from pattern start until the last tone has decayed.
    pub fn span(&self) -> Duration {
        self.tones
            .iter()
            .map(Tone::end)
            .max()
            .unwrap_or_default()
    }

    /// Mix all tones into mono samples in `[-1.0, 1.0]`.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = sample_rate as f32;
        let total = (self.span().as_secs_f64() * sample_rate as f64).ceil() as usize;
        let mut samples = vec![0.0f32; total];

        for tone in &self.tones {
            let first = (tone.offset.as_secs_f64() * sample_rate as f64).round() as usize;
            let count = (tone.duration.as_secs_f64() * sample_rate as f64).round() as usize;
            let mut phase = 0.0f32;

            for (n, sample) in samples.iter_mut().skip(first).take(count).enumerate() {
                let t = Duration::from_secs_f32(n as f32 / rate);
                *sample += tone.gain_at(t) * phase.sin();
                phase = (phase + TAU * tone.frequency_at(t) / rate) % TAU;
            }
        }

        for sample in &mut samples {
            *sample = sample.clamp(-1.0, 1.0);
        }
        samples
    }
}

/// Minimal fallback sound: a single fixed-frequency oscillator.
#[derive(Debug, Clone, PartialEq)]
pub struct Beep {
    pub frequency_hz: f32,
    pub gain: f32,
    pub duration: Duration,
}

impl Default for Beep {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            gain: 0.2,
            duration: Duration::from_millis(200),
        }
    }
}
