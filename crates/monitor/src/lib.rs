//! Drowsiness Monitor
//!
//! Client side of the drowsiness alert loop. A capture session samples the
//! camera at a fixed cadence, sends each frame to the detection service with
//! at most one request in flight, and feeds the answers to the alarm.

pub mod client;
pub mod session;
pub mod settings;

pub use client::{ClientConfig, ClientError, DetectionClient};
pub use session::{Session, SessionController, SessionError, SessionStatus};
pub use settings::{MonitorSettings, SourceConfig};
