use axum::routing::get;
use axum::Router;
use boardb::{CaptureOptions, MetricEvent, Monitor, MonitorConfig, MonitorError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

// --- Test helpers ---

fn ephemeral_config() -> MonitorConfig {
    MonitorConfig {
        capacity: 10,
        dashboard_addr: "127.0.0.1:0".parse().unwrap(),
        static_dir: None,
    }
}

/// Minimal HTTP/1.1 GET; returns the raw response text.
async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

// --- Lifecycle ---

#[test]
fn test_capacity_is_floored_by_monitor() {
    let monitor = Monitor::new(ephemeral_config());
    assert_eq!(monitor.metrics().capacity(), 100);
}

#[tokio::test]
async fn test_dashboard_serves_collector() {
    let monitor = Monitor::new(ephemeral_config());
    monitor
        .metrics()
        .add(MetricEvent::new("GET", "/api/a", 200, 5, 1));

    let addr = monitor.start_dashboard().await.unwrap();
    assert_ne!(addr.port(), 0);

    let response = http_get(addr, "/api/metrics/count").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#"{"count":1}"#), "{response}");

    monitor.stop().await.unwrap();
    assert_eq!(monitor.dashboard_addr().await, None);
}

#[tokio::test]
async fn test_stop_ends_open_event_streams() {
    let monitor = Monitor::new(ephemeral_config());
    let addr = monitor.start_dashboard().await.unwrap();

    let mut client = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET /api/metrics/stream HTTP/1.1\r\nHost: {addr}\r\n\r\n");
    client.write_all(request.as_bytes()).await.unwrap();

    // Wait for the first snapshot so the stream is known to be live
    let mut received = Vec::new();
    let mut chunk = [0u8; 256];
    tokio::time::timeout(Duration::from_secs(5), async {
        while !String::from_utf8_lossy(&received).contains("data:") {
            let n = client.read(&mut chunk).await.unwrap();
            assert_ne!(n, 0, "stream closed before the first frame");
            received.extend_from_slice(&chunk[..n]);
        }
    })
    .await
    .expect("no snapshot within 5s");

    // Well under the abort grace period: the stream itself must end
    tokio::time::timeout(Duration::from_secs(3), monitor.stop())
        .await
        .expect("stop() hung on an open event stream")
        .unwrap();
    assert_eq!(monitor.dashboard_addr().await, None);

    // The server closes the connection once the stream is finished
    let mut rest = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(3), client.read_to_end(&mut rest))
        .await
        .expect("connection left open after stop()");
}

#[tokio::test]
async fn test_start_twice_returns_same_address() {
    let monitor = Monitor::new(ephemeral_config());

    let first = monitor.start_dashboard().await.unwrap();
    let second = monitor.start_dashboard().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(monitor.dashboard_addr().await, Some(first));

    monitor.stop().await.unwrap();
    // Stopping again is a no-op
    monitor.stop().await.unwrap();
}

#[tokio::test]
async fn test_missing_static_dir_is_rejected() {
    let monitor = Monitor::new(MonitorConfig {
        static_dir: Some("/definitely/not/here".into()),
        ..ephemeral_config()
    });

    let result = monitor.start_dashboard().await;
    assert!(matches!(result, Err(MonitorError::Config(_))));
    assert_eq!(monitor.dashboard_addr().await, None);
}

#[tokio::test]
async fn test_instrumented_router_feeds_monitor() {
    use tower::ServiceExt;

    let monitor = Monitor::default();
    let app = monitor.instrument(
        Router::new().route("/api/ping", get(|| async { "pong" })),
        CaptureOptions::default(),
    );

    let request = axum::http::Request::builder()
        .uri("/api/ping")
        .body(axum::body::Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap();

    assert_eq!(monitor.metrics().count(), 1);
    assert_eq!(monitor.metrics().summary().success_rate, 100);
}
