//! Synthesized alarm tone (rise, hold, decay)

use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tone shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub peak_gain: f32,
    /// Gain at the start of the rise and the end of the decay
    pub floor_gain: f32,
    pub rise_ms: u64,
    pub hold_ms: u64,
    pub decay_ms: u64,
    pub sample_rate: u32,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            peak_gain: 0.2,
            floor_gain: 0.0001,
            rise_ms: 20,
            hold_ms: 780,
            decay_ms: 150,
            sample_rate: 44_100,
        }
    }
}

impl ToneSpec {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.rise_ms + self.hold_ms + self.decay_ms)
    }

    /// Exponential envelope gain at `t_ms` into the tone
    pub fn envelope(&self, t_ms: f32) -> f32 {
        let rise = self.rise_ms as f32;
        let hold_end = rise + self.hold_ms as f32;
        let end = hold_end + self.decay_ms as f32;
        let ratio = self.peak_gain / self.floor_gain;

        if t_ms < 0.0 || t_ms >= end {
            0.0
        } else if t_ms < rise {
            self.floor_gain * ratio.powf(t_ms / rise)
        } else if t_ms < hold_end {
            self.peak_gain
        } else {
            self.peak_gain * ratio.powf(-(t_ms - hold_end) / self.decay_ms.max(1) as f32)
        }
    }

    /// Render the tone to mono samples
    pub fn synthesize(&self) -> Tone {
        let duration = self.duration();
        let count = (duration.as_secs_f64() * self.sample_rate as f64).round() as usize;
        let rate = self.sample_rate as f32;

        let samples: Vec<f32> = (0..count)
            .map(|i| {
                let t = i as f32 / rate;
                self.envelope(t * 1000.0) * (TAU * self.frequency_hz * t).sin()
            })
            .collect();

        Tone {
            samples: samples.into(),
            sample_rate: self.sample_rate,
            duration,
        }
    }
}

/// Rendered tone, cheap to clone
#[derive(Debug, Clone)]
pub struct Tone {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
    pub duration: Duration,
}
