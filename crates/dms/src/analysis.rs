//! Detection results exchanged with the capture client

use serde::{Deserialize, Serialize};

/// Classification message attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMessage {
    /// A single face was analysed
    #[default]
    Ok,
    /// Zero or several faces in the frame
    NoFace,
}

impl DetectionMessage {
    pub fn is_ok(&self) -> bool {
        matches!(self, DetectionMessage::Ok)
    }
}

/// Outcome of one detect request/response cycle.
///
/// On the wire `ear`, `message` and `error` are omitted when absent and
/// `frames_below` / `drowsy` default to `0` / `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Eye aspect ratio of the frame, rounded to 4 decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ear: Option<f32>,

    /// Consecutive frames below the EAR threshold
    #[serde(default)]
    pub frames_below: u32,

    /// Whether the debounced decision is drowsy
    #[serde(default)]
    pub drowsy: bool,

    #[serde(default, skip_serializing_if = "DetectionMessage::is_ok")]
    pub message: DetectionMessage,

    /// Set when the request failed; the other fields are then meaningless
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    /// Result carrying only an error
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_no_face(&self) -> bool {
        self.message == DetectionMessage::NoFace
    }
}
