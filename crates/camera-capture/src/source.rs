//! Camera sources
//!
//! A source is acquired once per capture session and released when the
//! session ends. Frames are grabbed on demand by the sampler.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tracing::{debug, info, warn};

use crate::frame::VideoFrame;
use crate::{unix_time_ns, CameraError};

/// A video source the sampler can grab frames from
pub trait CameraSource: Send + Sync {
    /// Take exclusive ownership of the device
    fn acquire(&self) -> Result<(), CameraError>;

    /// Give the device back. Must tolerate being called while not acquired.
    fn release(&self);

    /// Whether the source is currently acquired
    fn is_active(&self) -> bool;

    /// Native frame size, if the source has reported one
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Grab the current frame at the requested size
    fn grab(&self, width: u32, height: u32) -> Result<VideoFrame, CameraError>;
}

/// Generated moving test pattern; stands in for a webcam
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    available: bool,
    active: AtomicBool,
    sequence: AtomicU32,
    release_calls: AtomicU32,
}

impl SyntheticCamera {
    /// Create a synthetic camera reporting the given size.
    /// A zero dimension means the size is not reported.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            available: true,
            active: AtomicBool::new(false),
            sequence: AtomicU32::new(0),
            release_calls: AtomicU32::new(0),
        }
    }

    /// A camera whose acquisition always fails
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(640, 480)
        }
    }

    /// Number of times `release` was called
    pub fn release_calls(&self) -> u32 {
        self.release_calls.load(Ordering::Relaxed)
    }
}

impl CameraSource for SyntheticCamera {
    fn acquire(&self) -> Result<(), CameraError> {
        if !self.available {
            return Err(CameraError::Open("synthetic camera is unavailable".into()));
        }
        self.active.store(true, Ordering::Release);
        info!("Synthetic camera acquired");
        Ok(())
    }

    fn release(&self) {
        self.release_calls.fetch_add(1, Ordering::Relaxed);
        if self.active.swap(false, Ordering::AcqRel) {
            info!("Synthetic camera released");
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        (self.width > 0 && self.height > 0).then_some((self.width, self.height))
    }

    fn grab(&self, width: u32, height: u32) -> Result<VideoFrame, CameraError> {
        if !self.is_active() {
            return Err(CameraError::NotInitialized);
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let shift = (sequence % 256) as u8;

        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x as u8).wrapping_add(shift), y as u8, 128]);
            }
        }

        Ok(VideoFrame::new(data, width, height, unix_time_ns(), sequence))
    }
}

/// Serves one still image loaded from disk, e.g. a recorded face shot
pub struct StillImageCamera {
    image: VideoFrame,
    active: AtomicBool,
    sequence: AtomicU32,
}

impl StillImageCamera {
    /// Load the image at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let rgb = image::open(path)
            .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        debug!("Loaded still image {} ({}x{})", path.display(), width, height);

        Ok(Self::from_frame(VideoFrame::new(rgb.into_raw(), width, height, 0, 0)))
    }

    /// Serve an in-memory frame
    pub fn from_frame(image: VideoFrame) -> Self {
        Self {
            image,
            active: AtomicBool::new(false),
            sequence: AtomicU32::new(0),
        }
    }
}

impl CameraSource for StillImageCamera {
    fn acquire(&self) -> Result<(), CameraError> {
        if self.image.width == 0 || self.image.height == 0 {
            return Err(CameraError::Open("still image is empty".into()));
        }
        self.active.store(true, Ordering::Release);
        Ok(())
    }

    fn release(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.image.width, self.image.height))
    }

    fn grab(&self, width: u32, height: u32) -> Result<VideoFrame, CameraError> {
        if !self.is_active() {
            return Err(CameraError::NotInitialized);
        }

        let mut frame = if (width, height) == (self.image.width, self.image.height) {
            self.image.clone()
        } else {
            warn!(
                "Resizing still image {}x{} to {}x{}",
                self.image.width, self.image.height, width, height
            );
            self.image.resize(width, height)
        };
        frame.timestamp_ns = unix_time_ns();
        frame.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_lifecycle() {
        let camera = SyntheticCamera::new(32, 24);
        assert!(!camera.is_active());
        assert!(matches!(camera.grab(32, 24), Err(CameraError::NotInitialized)));

        camera.acquire().unwrap();
        let first = camera.grab(32, 24).unwrap();
        let second = camera.grab(32, 24).unwrap();
        assert_eq!(first.data.len(), 32 * 24 * 3);
        assert_eq!(second.sequence, first.sequence + 1);

        camera.release();
        camera.release();
        assert!(!camera.is_active());
        assert_eq!(camera.release_calls(), 2);
    }

    #[test]
    fn test_unavailable_camera() {
        let camera = SyntheticCamera::unavailable();
        assert!(matches!(camera.acquire(), Err(CameraError::Open(_))));
        assert!(!camera.is_active());
    }

    #[test]
    fn test_unreported_dimensions() {
        assert_eq!(SyntheticCamera::new(0, 0).dimensions(), None);
        assert_eq!(SyntheticCamera::new(320, 240).dimensions(), Some((320, 240)));
    }

    #[test]
    fn test_still_image_resizes_on_request() {
        let camera = StillImageCamera::from_frame(VideoFrame::new(vec![9; 8 * 4 * 3], 8, 4, 0, 0));
        camera.acquire().unwrap();

        let native = camera.grab(8, 4).unwrap();
        let smaller = camera.grab(4, 2).unwrap();
        assert_eq!(native.data.len(), 8 * 4 * 3);
        assert_eq!((smaller.width, smaller.height), (4, 2));
        assert_eq!(smaller.sequence, 1);
    }
}
