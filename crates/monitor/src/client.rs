//! Detection service client
//!
//! One request at a time: a frame offered while the previous request is
//! still outstanding is dropped, never queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use camera_capture::EncodedFrame;
use dms::{DetectionResult, SESSION_HEADER};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Client errors; surfaced to callers as failed [`DetectionResult`]s
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Server error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response (HTTP {status}): {reason}")]
    Malformed { status: u16, reason: String },
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Full URL of the detect endpoint
    pub endpoint: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/detect".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Serialize)]
struct DetectRequest {
    image: String,
}

/// Clears the in-flight flag however the request ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// HTTP client for `POST /detect`
pub struct DetectionClient {
    http: reqwest::Client,
    endpoint: String,
    in_flight: AtomicBool,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl DetectionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            in_flight: AtomicBool::new(false),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Whether a request is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Requests issued so far
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Frames dropped because a request was outstanding
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Send one frame for analysis.
    ///
    /// Returns `None` when the frame was dropped because another request is
    /// in flight. Transport and decoding failures come back as a result
    /// carrying `error`.
    pub async fn send_frame(
        &self,
        frame: EncodedFrame,
        session: Option<&str>,
    ) -> Option<DetectionResult> {
        let _guard = match self.in_flight.compare_exchange(
            false,
            true,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => InFlight(&self.in_flight),
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Request in flight, dropping frame {}", frame.sequence);
                return None;
            }
        };
        self.sent.fetch_add(1, Ordering::Relaxed);

        let mut request = self.http.post(&self.endpoint).json(&DetectRequest {
            image: frame.to_data_uri(),
        });
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }

        match self.exchange(request).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Detection request for frame {} failed: {}", frame.sequence, e);
                Some(DetectionResult::failure(e.to_string()))
            }
        }
    }

    async fn exchange(&self, request: reqwest::RequestBuilder) -> Result<DetectionResult, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let result: DetectionResult =
            serde_json::from_slice(&body).map_err(|e| ClientError::Malformed {
                status: status.as_u16(),
                reason: e.to_string(),
            })?;

        // error statuses must explain themselves
        if !status.is_success() && result.error.is_none() {
            return Err(ClientError::Malformed {
                status: status.as_u16(),
                reason: "error status without message".to_string(),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_flag() {
        let flag = AtomicBool::new(true);
        {
            let _guard = InFlight(&flag);
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.endpoint.ends_with("/detect"));
        assert_eq!(config.timeout_ms, 5000);
    }
}
