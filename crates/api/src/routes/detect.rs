//! Detection Route

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use camera_capture::decode_data_uri;
use dms::{DetectionResult, DEFAULT_SESSION};
use serde::Deserialize;
use tokio::task;
use tracing::debug;

use crate::{ApiError, SharedState, SESSION_HEADER};

/// Longest accepted session id
const MAX_SESSION_ID_LEN: usize = 64;

/// Request body for `POST /detect`
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// `data:image/jpeg;base64,...`
    #[serde(default)]
    pub image: Option<String>,
}

/// Classify one frame for the calling session
pub async fn detect(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectionResult>, ApiError> {
    metrics::counter!("detect_requests_total").increment(1);

    let image = match payload {
        Ok(Json(request)) => request.image.filter(|s| !s.is_empty()),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ApiError::PayloadTooLarge)
        }
        Err(rejection) => {
            debug!("Rejected detect body: {}", rejection);
            None
        }
    }
    .ok_or(ApiError::MissingImage)?;

    let session = session_id(&headers).to_string();

    // decoding and landmark extraction are CPU-bound
    let frame = task::spawn_blocking(move || decode_data_uri(&image)).await??;
    let mut guard = state.write_owned().await;
    let analyzed = session.clone();
    let result = task::spawn_blocking(move || guard.dms.analyze(&analyzed, &frame)).await??;

    if result.is_no_face() {
        metrics::counter!("detect_no_face_total").increment(1);
    } else if result.drowsy {
        metrics::counter!("detect_drowsy_total").increment(1);
    }
    debug!(
        "session={} ear={:?} frames_below={} drowsy={}",
        session, result.ear, result.frames_below, result.drowsy
    );

    Ok(Json(result))
}

/// Session named by the client, or the shared default
fn session_id(headers: &HeaderMap) -> &str {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_SESSION_ID_LEN)
        .unwrap_or(DEFAULT_SESSION)
}
