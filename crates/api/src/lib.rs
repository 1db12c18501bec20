//! Drowsiness Detection Service
//!
//! HTTP front end for the DMS: accepts camera frames on `POST /detect` and
//! answers with the per-session drowsiness classification.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use camera_capture::CameraError;
use dms::{DmsError, DmsModule};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod routes;
pub mod settings;

pub use telemetry::{init_logging, LogConfig};
pub use settings::ServerSettings;

pub use dms::SESSION_HEADER;

/// Application state shared across handlers
pub struct AppState {
    /// Drowsiness tracking for every session
    pub dms: DmsModule,
    /// Prometheus exporter, when installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

pub type SharedState = Arc<RwLock<AppState>>;

impl AppState {
    /// Create new application state
    pub fn new(dms: DmsModule, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            dms,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Build the DMS from settings
    pub fn from_settings(
        settings: &ServerSettings,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, DmsError> {
        let extractor = settings.extractor.build()?;
        let dms = DmsModule::new(settings.dms.clone(), extractor)?;
        Ok(Self::new(dms, metrics))
    }
}

/// API errors, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image provided")]
    MissingImage,

    #[error("Image too large")]
    PayloadTooLarge,

    #[error("Could not decode image: {0}")]
    Decode(#[from] CameraError),

    #[error("Detection failed: {0}")]
    Detection(#[from] DmsError),

    #[error("Detection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::counter!("detect_errors_total").increment(1);

        let status = match &self {
            ApiError::MissingImage | ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Detection(_) | ApiError::Task(_) => {
                error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub sessions: usize,
}

/// Create the application router
pub fn create_router(state: SharedState, body_limit: usize) -> Router {
    Router::new()
        .route("/detect", post(routes::detect::detect))
        .route("/api/v1/sessions/:id", delete(routes::sessions::reset))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        sessions: state.dms.session_count(),
    })
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<SharedState>) -> Response {
    match &state.read().await.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Periodically drop sessions nobody has sent frames for
pub fn spawn_session_eviction(state: SharedState, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            state.write().await.dms.evict_idle();
        }
    })
}

/// Run the server until Ctrl-C
pub async fn run_server(
    settings: ServerSettings,
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    let state = Arc::new(RwLock::new(AppState::from_settings(&settings, metrics)?));
    let eviction = spawn_session_eviction(
        state.clone(),
        Duration::from_secs(settings.eviction_interval_secs.max(1)),
    );
    let app = create_router(state, settings.body_limit_bytes);

    info!("Starting detection service on {}", settings.bind);

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    eviction.abort();
    Ok(())
}
