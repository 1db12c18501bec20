//! Landmark extraction seam
//!
//! The face-mesh model lives outside this workspace. Anything that can turn
//! a frame into per-face landmarks plugs in through [`LandmarkExtractor`].
//! The extractors here synthesize landmarks for a given EAR and are meant
//! for demos and tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use camera_capture::frame::VideoFrame;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ear::{FaceLandmarks, Point, FACE_MESH_POINTS, LEFT_EYE, RIGHT_EYE};
use crate::DmsError;

/// Produces face landmarks for a frame
pub trait LandmarkExtractor: Send + Sync {
    /// Landmarks of every face found, empty when there is none
    fn extract(&self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError>;
}

/// Extractor selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorConfig {
    /// Always one face with the given EAR
    Stub { ear: f32 },
    /// Cycle through EAR values; a negative value means no face
    Scripted { script: Vec<f32> },
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig::Stub { ear: 0.3 }
    }
}

impl ExtractorConfig {
    pub fn build(&self) -> Result<Box<dyn LandmarkExtractor>, DmsError> {
        match self {
            ExtractorConfig::Stub { ear } => {
                warn!("No landmark model configured. Using stub extractor (EAR {}).", ear);
                Ok(Box::new(StubExtractor::new(*ear)))
            }
            ExtractorConfig::Scripted { script } => {
                if script.is_empty() {
                    return Err(DmsError::Config("scripted extractor needs at least one step".into()));
                }
                info!("Using scripted extractor with {} steps", script.len());
                let steps = script.iter().map(|&v| (v >= 0.0).then_some(v)).collect();
                Ok(Box::new(ScriptedExtractor::new(steps)))
            }
        }
    }
}

/// Reports one face with a fixed EAR for every frame
pub struct StubExtractor {
    ear: f32,
}

impl StubExtractor {
    pub fn new(ear: f32) -> Self {
        Self { ear }
    }
}

impl LandmarkExtractor for StubExtractor {
    fn extract(&self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
        Ok(vec![synthetic_face(self.ear, frame.width, frame.height)])
    }
}

/// Replays a script of observations, one step per frame, wrapping around.
/// `None` steps report no face.
pub struct ScriptedExtractor {
    steps: Vec<Option<f32>>,
    cursor: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(steps: Vec<Option<f32>>) -> Self {
        Self {
            steps,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl LandmarkExtractor for ScriptedExtractor {
    fn extract(&self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
        if self.steps.is_empty() {
            return Ok(Vec::new());
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.steps.len();
        Ok(self.steps[idx]
            .map(|ear| synthetic_face(ear, frame.width, frame.height))
            .into_iter()
            .collect())
    }
}

/// Face mesh whose eyes have exactly the given EAR in a frame of this size
pub fn synthetic_face(ear: f32, width: u32, height: u32) -> FaceLandmarks {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let mut points = vec![Point::new(0.5, 0.5); FACE_MESH_POINTS];

    for (indices, cx) in [(LEFT_EYE, 0.35 * w), (RIGHT_EYE, 0.65 * w)] {
        let cy = 0.4 * h;
        let r = 0.05 * w;
        let lid = r * ear;
        let pixels = [
            (cx - r, cy),
            (cx - r / 2.0, cy - lid),
            (cx + r / 2.0, cy - lid),
            (cx + r, cy),
            (cx + r / 2.0, cy + lid),
            (cx - r / 2.0, cy + lid),
        ];
        for (&idx, (x, y)) in indices.iter().zip(pixels) {
            points[idx] = Point::new(x / w, y / h);
        }
    }

    FaceLandmarks { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ear::frame_ear;

    fn frame() -> VideoFrame {
        VideoFrame::new(vec![0; 64 * 48 * 3], 64, 48, 0, 0)
    }

    #[test]
    fn test_synthetic_face_round_trips_ear() {
        for ear in [0.05f32, 0.2, 0.31] {
            let face = synthetic_face(ear, 640, 480);
            let measured = frame_ear(&face, 640, 480).unwrap();
            assert!((measured - ear).abs() < 1e-4, "{} vs {}", measured, ear);
        }
    }

    #[test]
    fn test_scripted_extractor_cycles() {
        let extractor = ScriptedExtractor::new(vec![Some(0.2), None]);
        let frame = frame();

        assert_eq!(extractor.extract(&frame).unwrap().len(), 1);
        assert!(extractor.extract(&frame).unwrap().is_empty());
        assert_eq!(extractor.extract(&frame).unwrap().len(), 1);
    }

    #[test]
    fn test_config_builds_extractors() {
        let scripted = ExtractorConfig::Scripted {
            script: vec![0.2, -1.0],
        };
        let extractor = scripted.build().unwrap();
        assert_eq!(extractor.extract(&frame()).unwrap().len(), 1);
        assert!(extractor.extract(&frame()).unwrap().is_empty());

        let empty = ExtractorConfig::Scripted { script: vec![] };
        assert!(matches!(empty.build(), Err(DmsError::Config(_))));
    }
}
