//! Session Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::SharedState;

/// Forget a session's eye state, e.g. on driver change
pub async fn reset(State(state): State<SharedState>, Path(id): Path<String>) -> StatusCode {
    if state.write().await.dms.reset_session(&id) {
        info!("Session {} reset", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
