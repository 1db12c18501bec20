//! Alarm controller
//!
//! Maps detection results to status text and sounds the alarm tone on a
//! drowsy result. One tone plays at a time: a trigger while the tone is
//! still playing is ignored. `playing` clears once the tone duration has
//! elapsed, whatever happened to the capture session in the meantime.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dms::DetectionResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::status::{StatusBoard, StatusText};
use crate::tone::{Tone, ToneSpec};
use crate::AlarmError;

/// Audio output
pub trait AudioSink: Send + Sync {
    /// Start playing the tone; must not block for its duration
    fn play(&self, tone: &Tone) -> Result<(), AlarmError>;
}

/// Rings the terminal bell
pub struct TerminalBell;

impl AudioSink for TerminalBell {
    fn play(&self, _tone: &Tone) -> Result<(), AlarmError> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| AlarmError::Playback(e.to_string()))
    }
}

/// Discards audio
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _tone: &Tone) -> Result<(), AlarmError> {
        Ok(())
    }
}

/// Which sink the monitor uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Bell,
    Silent,
}

impl SinkKind {
    pub fn build(self) -> Arc<dyn AudioSink> {
        match self {
            SinkKind::Bell => Arc::new(TerminalBell),
            SinkKind::Silent => Arc::new(NullSink),
        }
    }
}

/// Alarm configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub tone: ToneSpec,
    pub sink: SinkKind,
}

/// Drives the alarm tone and the status line from detection results
pub struct AlarmController {
    tone: Tone,
    sink: Arc<dyn AudioSink>,
    board: StatusBoard,
    playing: Arc<AtomicBool>,
    triggers: AtomicU64,
}

impl AlarmController {
    pub fn new(config: &AlarmConfig, sink: Arc<dyn AudioSink>, board: StatusBoard) -> Self {
        let tone = config.tone.synthesize();
        info!(
            "Alarm tone ready: {} Hz for {}ms",
            config.tone.frequency_hz,
            tone.duration.as_millis()
        );
        Self {
            tone,
            sink,
            board,
            playing: Arc::new(AtomicBool::new(false)),
            triggers: AtomicU64::new(0),
        }
    }

    /// React to one detection result; returns the status it set
    pub fn on_result(&self, result: &DetectionResult) -> StatusText {
        if let Some(error) = &result.error {
            let status = StatusText::Error(error.clone());
            self.board.set_state(status.clone());
            return status;
        }

        self.board
            .set_readouts(result.ear, Some(result.frames_below));

        let status = if result.is_no_face() {
            StatusText::NoFace
        } else if result.drowsy {
            self.trigger();
            StatusText::Drowsy
        } else {
            StatusText::Alert
        };

        self.board.set_state(status.clone());
        status
    }

    /// Start the tone unless one is already playing.
    /// Returns whether a new tone was started. Needs a Tokio runtime.
    pub fn trigger(&self) -> bool {
        if self.playing.swap(true, Ordering::AcqRel) {
            debug!("Alarm already playing, ignoring trigger");
            return false;
        }
        self.triggers.fetch_add(1, Ordering::Relaxed);
        warn!("Drowsiness alarm triggered");

        if let Err(e) = self.sink.play(&self.tone) {
            warn!("Alarm playback failed: {}", e);
        }

        let playing = self.playing.clone();
        let duration = self.tone.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            playing.store(false, Ordering::Release);
        });
        true
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Number of tones started so far
    pub fn trigger_count(&self) -> u64 {
        self.triggers.load(Ordering::Relaxed)
    }

    pub fn tone_duration(&self) -> std::time::Duration {
        self.tone.duration
    }
}
