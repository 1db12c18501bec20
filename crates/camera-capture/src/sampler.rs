//! Fixed-cadence frame sampler
//!
//! Captures one frame per tick while the source is active and hands it to a
//! [`FrameSink`]. Nothing is queued: when the sink reports it is still busy
//! with the previous frame, the tick is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::frame::EncodedFrame;
use crate::source::CameraSource;
use crate::{CameraConfig, CameraError};

/// Consumer of sampled frames
pub trait FrameSink: Send + Sync + 'static {
    /// Whether the sink can take a frame right now
    fn is_ready(&self) -> bool {
        true
    }

    /// Take ownership of a frame
    fn submit(&self, frame: EncodedFrame);
}

/// Sampler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Frames captured and submitted
    pub captured: u64,
    /// Ticks dropped because the sink was busy
    pub dropped: u64,
    /// Ticks where capture or encoding failed
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    captured: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Periodic frame sampler
pub struct FrameSampler {
    config: CameraConfig,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl FrameSampler {
    /// Create an idle sampler
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Start sampling `source` every `interval`, replacing any previous run.
    /// Must be called from within a Tokio runtime.
    pub fn start(
        &mut self,
        interval: Duration,
        source: Arc<dyn CameraSource>,
        sink: Arc<dyn FrameSink>,
    ) {
        self.stop();

        let running = Arc::new(AtomicBool::new(true));
        self.running = running.clone();
        let config = self.config.clone();
        let counters = self.counters.clone();

        info!("Starting frame sampler every {}ms", interval.as_millis());

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick fires immediately; the first capture is one interval in
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !running.load(Ordering::Acquire) {
                    break;
                }
                if !source.is_active() {
                    continue;
                }
                if !sink.is_ready() {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("Sink busy, dropping tick");
                    continue;
                }

                match capture_frame(source.as_ref(), &config) {
                    Ok(frame) => {
                        if !running.load(Ordering::Acquire) {
                            break;
                        }
                        counters.captured.fetch_add(1, Ordering::Relaxed);
                        sink.submit(frame);
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!("Frame capture failed: {}", e);
                    }
                }
            }
        }));
    }

    /// Cancel sampling. No frame is submitted after this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Frame sampler stopped");
        }
    }

    /// Whether a sampling task is installed
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> SamplerStats {
        SamplerStats {
            captured: self.counters.captured.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Grab and encode one frame, falling back to the configured size when the
/// source has not reported its own
pub fn capture_frame(
    source: &dyn CameraSource,
    config: &CameraConfig,
) -> Result<EncodedFrame, CameraError> {
    let (width, height) = source
        .dimensions()
        .unwrap_or((config.width, config.height));
    let frame = source.grab(width, height)?;
    frame.encode_jpeg(config.jpeg_quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticCamera;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        ready: AtomicBool,
        frames: Mutex<Vec<EncodedFrame>>,
    }

    impl CollectingSink {
        fn ready() -> Arc<Self> {
            let sink = Self::default();
            sink.ready.store(true, Ordering::Relaxed);
            Arc::new(sink)
        }

        fn count(&self) -> usize {
            self.frames.lock().unwrap().len()
        }
    }

    impl FrameSink for CollectingSink {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::Relaxed)
        }

        fn submit(&self, frame: EncodedFrame) {
            self.frames.lock().unwrap().push(frame);
        }
    }

    fn small_config() -> CameraConfig {
        CameraConfig {
            width: 32,
            height: 24,
            ..Default::default()
        }
    }

    fn active_camera(width: u32, height: u32) -> Arc<SyntheticCamera> {
        let camera = Arc::new(SyntheticCamera::new(width, height));
        camera.acquire().unwrap();
        camera
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_at_fixed_cadence() {
        let sink = CollectingSink::ready();
        let mut sampler = FrameSampler::new(small_config());
        sampler.start(Duration::from_millis(300), active_camera(16, 12), sink.clone());

        tokio::time::sleep(Duration::from_millis(950)).await;

        assert_eq!(sink.count(), 3);
        assert_eq!(sampler.stats().captured, 3);
        assert_eq!(sampler.stats().dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_captures() {
        let sink = CollectingSink::ready();
        let mut sampler = FrameSampler::new(small_config());
        sampler.start(Duration::from_millis(100), active_camera(16, 12), sink.clone());

        tokio::time::sleep(Duration::from_millis(250)).await;
        sampler.stop();
        let before = sink.count();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(before, 2);
        assert_eq!(sink.count(), before);
        assert!(!sampler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_sink_drops_ticks() {
        let sink = Arc::new(CollectingSink::default());
        let mut sampler = FrameSampler::new(small_config());
        sampler.start(Duration::from_millis(100), active_camera(16, 12), sink.clone());

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(sink.count(), 0);
        assert_eq!(sampler.stats().dropped, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_source_is_not_sampled() {
        let sink = CollectingSink::ready();
        let camera = Arc::new(SyntheticCamera::new(16, 12));
        let mut sampler = FrameSampler::new(small_config());
        sampler.start(Duration::from_millis(100), camera, sink.clone());

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(sink.count(), 0);
        assert_eq!(sampler.stats(), SamplerStats::default());
    }

    #[test]
    fn test_capture_falls_back_to_default_size() {
        let camera = active_camera(0, 0);
        let frame = capture_frame(camera.as_ref(), &small_config()).unwrap();
        assert_eq!((frame.width, frame.height), (32, 24));

        let camera = active_camera(20, 10);
        let frame = capture_frame(camera.as_ref(), &small_config()).unwrap();
        assert_eq!((frame.width, frame.height), (20, 10));
    }
}
