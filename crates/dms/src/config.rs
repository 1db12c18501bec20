//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye aspect ratio below which the eyes count as closed
    pub ear_threshold: f32,

    /// Consecutive closed-eye frames before the driver is drowsy
    pub consecutive_frames: u32,

    /// Session trackers untouched for this long are evicted (seconds)
    pub session_idle_secs: u64,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            consecutive_frames: 15,
            session_idle_secs: 600,
        }
    }
}

impl DmsConfig {
    /// Create strict config (alerts sooner)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.27,
            consecutive_frames: 10,
            ..Default::default()
        }
    }

    /// Create lenient config (tolerates longer closures)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.22,
            consecutive_frames: 20,
            ..Default::default()
        }
    }

    /// Reject thresholds that can never (or always) fire
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.ear_threshold.is_finite() && self.ear_threshold > 0.0) {
            return Err(DmsError::Config(format!(
                "ear_threshold must be a positive number, got {}",
                self.ear_threshold
            )));
        }
        if self.consecutive_frames == 0 {
            return Err(DmsError::Config(
                "consecutive_frames must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Idle eviction timeout as a duration
    pub fn session_idle(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_idle_secs)
    }
}
