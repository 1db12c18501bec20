//! User-facing status board
//!
//! The CLI counterpart of the capture page's status line, EAR / frame
//! readouts and start/stop buttons, published on a watch channel.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Status line text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusText {
    #[default]
    Idle,
    Ready,
    CameraUnavailable,
    Stopped,
    NoFace,
    Drowsy,
    Alert,
    Error(String),
}

impl fmt::Display for StatusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusText::Idle => f.write_str("Idle"),
            StatusText::Ready => f.write_str("Ready"),
            StatusText::CameraUnavailable => f.write_str("Camera unavailable"),
            StatusText::Stopped => f.write_str("Stopped"),
            StatusText::NoFace => f.write_str("No face detected"),
            StatusText::Drowsy => f.write_str("Drowsy! Wake up!"),
            StatusText::Alert => f.write_str("Alert"),
            StatusText::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Everything the user sees
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub state: StatusText,
    /// Last EAR, `-` when unknown
    pub ear: String,
    /// Last consecutive low-EAR frame count
    pub frames: String,
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            state: StatusText::Idle,
            ear: "-".to_string(),
            frames: "0".to_string(),
            start_enabled: true,
            stop_enabled: false,
        }
    }
}

/// Shared handle to the status view
#[derive(Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<StatusView>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusView::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn set_state(&self, state: StatusText) {
        self.tx.send_if_modified(|view| {
            if view.state == state {
                return false;
            }
            view.state = state;
            true
        });
    }

    /// Update the readouts; absent values render as `-` / `0`
    pub fn set_readouts(&self, ear: Option<f32>, frames: Option<u32>) {
        let ear = ear.map_or_else(|| "-".to_string(), |e| e.to_string());
        let frames = frames.map_or_else(|| "0".to_string(), |n| n.to_string());
        self.tx.send_if_modified(|view| {
            if view.ear == ear && view.frames == frames {
                return false;
            }
            view.ear = ear;
            view.frames = frames;
            true
        });
    }

    pub fn set_controls(&self, start_enabled: bool, stop_enabled: bool) {
        self.tx.send_modify(|view| {
            view.start_enabled = start_enabled;
            view.stop_enabled = stop_enabled;
        });
    }

    /// Current view
    pub fn snapshot(&self) -> StatusView {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> StatusText {
        self.tx.borrow().state.clone()
    }

    /// Receive every change from now on
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.tx.subscribe()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
