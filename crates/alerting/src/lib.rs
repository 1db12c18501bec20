//! Alerting System
//!
//! Provides the drowsiness alarm: status rendering, a synthesized tone and
//! a re-entrancy guard so overlapping triggers never stack sounds.

mod alarm;
pub mod status;
pub mod tone;

pub use alarm::{AlarmConfig, AlarmController, AudioSink, NullSink, SinkKind, TerminalBell};
pub use status::{StatusBoard, StatusText, StatusView};
pub use tone::{Tone, ToneSpec};

use thiserror::Error;

/// Alarm errors
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("Audio playback failed: {0}")]
    Playback(String),
}
