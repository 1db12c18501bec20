//! Driver Monitoring System (DMS)
//!
//! Turns per-frame face landmarks into a debounced drowsiness decision:
//! - Eye aspect ratio (EAR) from eye landmarks
//! - Consecutive low-EAR frame counting per session
//! - Drowsy / alert / no-face classification

pub mod analysis;
pub mod config;
pub mod detector;
pub mod ear;
pub mod sessions;
pub mod state;
pub mod tracker;

pub use analysis::{DetectionMessage, DetectionResult};
pub use config::DmsConfig;
pub use detector::{ExtractorConfig, LandmarkExtractor, ScriptedExtractor, StubExtractor};
pub use sessions::{SessionRegistry, DEFAULT_SESSION, SESSION_HEADER};
pub use state::{EyePhase, EyeState, Observation};
pub use tracker::EyeStateTracker;

use camera_capture::frame::VideoFrame;
use thiserror::Error;
use tracing::debug;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Landmark extraction failed: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keypoints missing for feature calculation")]
    KeypointsMissing,
}

/// Driver monitoring module
pub struct DmsModule {
    config: DmsConfig,
    extractor: Box<dyn LandmarkExtractor>,
    sessions: SessionRegistry,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig, extractor: Box<dyn LandmarkExtractor>) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            sessions: SessionRegistry::new(config.clone()),
            extractor,
            config,
        })
    }

    /// Analyze a single frame for the given session
    pub fn analyze(&mut self, session: &str, frame: &VideoFrame) -> Result<DetectionResult, DmsError> {
        let faces = self.extractor.extract(frame)?;

        let observation = match faces.as_slice() {
            [face] => Observation::Face {
                ear: ear::frame_ear(face, frame.width, frame.height)?,
            },
            [] => Observation::NoFace,
            many => {
                debug!("{} faces in frame, not guessing which is the driver", many.len());
                Observation::NoFace
            }
        };

        Ok(self.sessions.tracker_mut(session).update(observation))
    }

    /// Reset one session's state (on driver change)
    pub fn reset_session(&mut self, session: &str) -> bool {
        self.sessions.remove(session)
    }

    /// Drop sessions idle longer than the configured timeout
    pub fn evict_idle(&mut self) -> usize {
        self.sessions.evict_idle(self.config.session_idle())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }
}
