//! Camera Capture Library for Drowsiness Monitoring
//!
//! Provides the capture side of the drowsiness alert loop:
//! - Camera sources (synthetic test pattern, still image)
//! - Fixed-cadence frame sampling with drop-newest backpressure
//! - JPEG encoding and data-URI framing for the detection service

pub mod frame;
pub mod sampler;
pub mod source;

pub use frame::{
    decode_data_uri, decode_data_uri_within, EncodedFrame, VideoFrame, DEFAULT_JPEG_QUALITY,
    MAX_DECODE_DIMENSION,
};
pub use sampler::{capture_frame, FrameSampler, FrameSink, SamplerStats};
pub use source::{CameraSource, StillImageCamera, SyntheticCamera};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Image codec error: {0}")]
    Codec(String),

    #[error("Camera not initialized")]
    NotInitialized,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Fallback capture width when the source has not reported its size
    pub width: u32,
    /// Fallback capture height when the source has not reported its size
    pub height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Sampling interval in milliseconds
    pub interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            interval_ms: 300,
        }
    }
}

impl CameraConfig {
    /// Sampling interval as a duration
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Wall-clock timestamp in nanoseconds
pub(crate) fn unix_time_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
