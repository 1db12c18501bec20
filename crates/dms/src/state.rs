//! Eye state tracking

use serde::{Deserialize, Serialize};

use crate::DmsConfig;

/// Debounce phase derived from the low-EAR counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EyePhase {
    /// Counter is zero
    #[default]
    Alert,
    /// Eyes closed, not yet for long enough
    Accumulating,
    /// Eyes closed for at least the required number of frames
    Drowsy,
}

/// One per-frame observation from the landmark extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Exactly one face, with its eye aspect ratio
    Face { ear: f32 },
    /// Zero or several faces
    NoFace,
}

/// Per-session eye state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeState {
    /// Consecutive frames with a face and EAR below threshold
    pub consecutive_low_ear_count: u32,
    pub ear_threshold: f32,
    pub consecutive_frames_required: u32,
}

impl EyeState {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            consecutive_low_ear_count: 0,
            ear_threshold: config.ear_threshold,
            consecutive_frames_required: config.consecutive_frames,
        }
    }

    pub fn phase(&self) -> EyePhase {
        match self.consecutive_low_ear_count {
            0 => EyePhase::Alert,
            n if n < self.consecutive_frames_required => EyePhase::Accumulating,
            _ => EyePhase::Drowsy,
        }
    }

    pub fn is_drowsy(&self) -> bool {
        self.phase() == EyePhase::Drowsy
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        self.consecutive_low_ear_count = 0;
    }
}

impl Default for EyeState {
    fn default() -> Self {
        Self::new(&DmsConfig::default())
    }
}
