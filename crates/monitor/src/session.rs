//! Capture session lifecycle
//!
//! `Idle -> Active -> Stopped`. Starting acquires the camera and begins
//! sampling; stopping ends sampling, releases the camera and discards any
//! result still on its way back from the service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alerting::{AlarmController, StatusBoard, StatusText};
use camera_capture::{CameraConfig, CameraError, CameraSource, EncodedFrame, FrameSampler, FrameSink};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::DetectionClient;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(#[from] CameraError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Active,
    Stopped,
}

/// A running capture session
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    /// Open while results may still be applied
    accepting: Arc<AtomicBool>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Active,
            started_at: Utc::now(),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Sampler sink that forwards frames to the service and results to the alarm
struct DetectionPipeline {
    session_id: String,
    client: Arc<DetectionClient>,
    alarm: Arc<AlarmController>,
    accepting: Arc<AtomicBool>,
}

impl FrameSink for DetectionPipeline {
    fn is_ready(&self) -> bool {
        self.accepting.load(Ordering::Acquire) && !self.client.is_busy()
    }

    fn submit(&self, frame: EncodedFrame) {
        let session_id = self.session_id.clone();
        let client = self.client.clone();
        let alarm = self.alarm.clone();
        let accepting = self.accepting.clone();

        tokio::spawn(async move {
            let Some(result) = client.send_frame(frame, Some(session_id.as_str())).await else {
                return;
            };
            if !accepting.load(Ordering::Acquire) {
                debug!("Session {} ended, discarding result", session_id);
                return;
            }
            alarm.on_result(&result);
        });
    }
}

/// Owns the camera for the lifetime of each capture session
pub struct SessionController {
    camera: Arc<dyn CameraSource>,
    client: Arc<DetectionClient>,
    alarm: Arc<AlarmController>,
    board: StatusBoard,
    sampler: FrameSampler,
    interval: Duration,
    status: SessionStatus,
    session: Option<Session>,
}

impl SessionController {
    pub fn new(
        camera: Arc<dyn CameraSource>,
        client: Arc<DetectionClient>,
        alarm: Arc<AlarmController>,
        board: StatusBoard,
        config: CameraConfig,
    ) -> Self {
        Self {
            camera,
            client,
            alarm,
            board,
            interval: config.interval(),
            sampler: FrameSampler::new(config),
            status: SessionStatus::Idle,
            session: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Current session, or the last one once stopped
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn active(&mut self) -> Option<&mut Session> {
        self.session
            .as_mut()
            .filter(|s| s.status == SessionStatus::Active)
    }

    /// Acquire the camera and begin sampling. Starting an active session is
    /// a no-op. Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<Uuid, SessionError> {
        if let Some(session) = self.active() {
            debug!("Session {} already active", session.id);
            return Ok(session.id);
        }

        if let Err(e) = self.camera.acquire() {
            warn!("Camera acquisition failed: {}", e);
            self.board.set_state(StatusText::CameraUnavailable);
            return Err(e.into());
        }

        let session = Session::new();
        let pipeline = Arc::new(DetectionPipeline {
            session_id: session.id.to_string(),
            client: self.client.clone(),
            alarm: self.alarm.clone(),
            accepting: session.accepting.clone(),
        });

        self.board.set_state(StatusText::Ready);
        self.board.set_controls(false, true);
        self.sampler
            .start(self.interval, self.camera.clone(), pipeline);

        info!(
            "Capture session {} started, sampling every {}ms",
            session.id,
            self.interval.as_millis()
        );
        let id = session.id;
        self.status = SessionStatus::Active;
        self.session = Some(session);
        Ok(id)
    }

    /// End the session. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        self.sampler.stop();

        let stats = self.sampler.stats();
        if let Some(session) = self.active() {
            session.accepting.store(false, Ordering::Release);
            session.status = SessionStatus::Stopped;
            info!(
                "Capture session {} stopped after {}s ({} frames sent, {} dropped)",
                session.id,
                (Utc::now() - session.started_at).num_seconds(),
                stats.captured,
                stats.dropped
            );
            self.camera.release();
        }

        self.status = SessionStatus::Stopped;
        self.board.set_controls(true, false);
        self.board.set_state(StatusText::Stopped);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.active().is_some() {
            self.stop();
        }
    }
}
