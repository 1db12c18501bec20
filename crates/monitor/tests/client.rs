mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use common::{dead_endpoint, encoded_frame, serve, Probe};
use dms::SESSION_HEADER;
use monitor::{ClientConfig, DetectionClient};
use serde_json::{json, Value};

fn client(endpoint: String, timeout_ms: u64) -> Arc<DetectionClient> {
    let config = ClientConfig {
        endpoint,
        timeout_ms,
    };
    Arc::new(DetectionClient::new(&config).expect("client"))
}

async fn slow_detect(State(probe): State<Arc<Probe>>) -> Json<Value> {
    probe.enter();
    tokio::time::sleep(Duration::from_millis(200)).await;
    probe.leave();
    Json(json!({"ear": 0.3, "frames_below": 0, "drowsy": false}))
}

#[tokio::test]
async fn frame_offered_while_in_flight_is_dropped() {
    let probe = Arc::new(Probe::default());
    let router = Router::new()
        .route("/detect", post(slow_detect))
        .with_state(probe.clone());
    let client = client(serve(router).await, 5000);

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.send_frame(encoded_frame(1), None).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.is_busy());

    assert!(client.send_frame(encoded_frame(2), None).await.is_none());

    let result = first.await.expect("join").expect("first frame answered");
    assert_eq!(result.ear, Some(0.3));
    assert!(!result.drowsy);
    assert!(!client.is_busy());
    assert_eq!(client.sent(), 1);
    assert_eq!(client.dropped(), 1);
    assert_eq!(probe.peak(), 1);

    // free again once the answer is in
    assert!(client.send_frame(encoded_frame(3), None).await.is_some());
}

#[tokio::test]
async fn sends_data_uri_and_session_header() {
    async fn check(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let image = body["image"].as_str().unwrap_or_default();
        let session = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if image.starts_with("data:image/jpeg;base64,") && session == "cab-1" {
            (StatusCode::OK, Json(json!({"ear": 0.2, "frames_below": 7, "drowsy": false})))
        } else {
            (StatusCode::BAD_REQUEST, Json(json!({"error": "unexpected request"})))
        }
    }

    let client = client(serve(Router::new().route("/detect", post(check))).await, 5000);
    let result = client
        .send_frame(encoded_frame(1), Some("cab-1"))
        .await
        .expect("answered");

    assert_eq!(result.error, None);
    assert_eq!(result.frames_below, 7);
}

#[tokio::test]
async fn service_error_message_is_passed_through() {
    async fn reject() -> (StatusCode, Json<Value>) {
        (StatusCode::BAD_REQUEST, Json(json!({"error": "No image provided"})))
    }

    let client = client(serve(Router::new().route("/detect", post(reject))).await, 5000);
    let result = client.send_frame(encoded_frame(1), None).await.expect("answered");

    assert_eq!(result.error.as_deref(), Some("No image provided"));
}

#[tokio::test]
async fn unreachable_service_yields_error_result() {
    let client = client(dead_endpoint().await, 5000);
    let result = client.send_frame(encoded_frame(1), None).await.expect("answered");

    let error = result.error.expect("error set");
    assert!(error.starts_with("Server error"), "{}", error);
    assert!(!client.is_busy());
}

#[tokio::test]
async fn malformed_responses_yield_error_results() {
    async fn garbage() -> &'static str {
        "definitely not json"
    }
    async fn bare_failure() -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    let router = Router::new()
        .route("/detect", post(garbage))
        .route("/gateway/detect", post(bare_failure));
    let endpoint = serve(router).await;

    let result = client(endpoint.clone(), 5000)
        .send_frame(encoded_frame(1), None)
        .await
        .expect("answered");
    assert!(result.error.expect("error set").contains("Malformed"));

    let gateway = endpoint.replace("/detect", "/gateway/detect");
    let result = client(gateway, 5000)
        .send_frame(encoded_frame(2), None)
        .await
        .expect("answered");
    assert!(result.error.expect("error set").contains("502"));
}

#[tokio::test]
async fn slow_service_times_out() {
    async fn stall() -> Json<Value> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Json(json!({"frames_below": 0, "drowsy": false}))
    }

    let client = client(serve(Router::new().route("/detect", post(stall))).await, 100);
    let result = client.send_frame(encoded_frame(1), None).await.expect("answered");

    assert!(result.is_error());
    assert!(!client.is_busy());
}
