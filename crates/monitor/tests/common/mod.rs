#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alerting::{StatusBoard, StatusView};
use axum::Router;
use camera_capture::{EncodedFrame, VideoFrame};

/// Serve `router` on an ephemeral port; returns the detect endpoint URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{}/detect", addr)
}

/// Endpoint nothing listens on
pub async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}/detect", addr)
}

pub fn encoded_frame(sequence: u32) -> EncodedFrame {
    VideoFrame::new(vec![90; 32 * 24 * 3], 32, 24, 0, sequence)
        .encode_jpeg(60)
        .expect("encode")
}

/// Concurrency probe for stub handlers
#[derive(Default)]
pub struct Probe {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Probe {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Wait until the board satisfies `pred`, failing after five seconds
pub async fn wait_for(board: &StatusBoard, pred: impl Fn(&StatusView) -> bool) -> StatusView {
    let mut rx = board.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let view = rx.borrow_and_update().clone();
            if pred(&view) {
                return view;
            }
            rx.changed().await.expect("status board alive");
        }
    })
    .await
    .expect("status condition not reached in time")
}
