use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::{self as axum_mw, Next},
    response::Response,
    Router,
};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{CaptureOptions, MAX_CAPTURED_BODY};
use crate::metrics::{MetricEvent, MetricsCollector};

/// State shared by every invocation of the capture middleware.
#[derive(Clone)]
pub struct Capture {
    pub metrics: Arc<MetricsCollector>,
    pub options: Arc<CaptureOptions>,
}

/// Wraps `router` so that every non-excluded request is recorded in
/// `metrics` once its response has been produced.
pub fn instrument<S>(
    router: Router<S>,
    metrics: Arc<MetricsCollector>,
    options: CaptureOptions,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let capture = Capture {
        metrics,
        options: Arc::new(options),
    };
    router.layer(axum_mw::from_fn_with_state(capture, capture_middleware))
}

/// Records one `MetricEvent` per request and adds a `Server-Timing`
/// response header carrying the measured duration.
pub async fn capture_middleware(
    State(capture): State<Capture>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    if capture.options.is_excluded(&path) {
        return next.run(req).await;
    }

    let timestamp = chrono::Utc::now().timestamp_millis();
    let start = Instant::now();

    let method = req.method().to_string();
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();
    let headers = capture
        .options
        .include_headers
        .then(|| header_map(req.headers()));

    let (req, body) = if capture.options.include_body {
        buffer_body(req).await
    } else {
        (req, None)
    };

    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    // ── Inject response header ──────────────────────────────────
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("server-timing", val);
    }

    // ── Record ──────────────────────────────────────────────────
    let status = response.status().as_u16();
    let response_time = elapsed.as_millis() as u64;

    let mut event = MetricEvent::new(method, path, status, response_time, timestamp)
        .with_client(ip, user_agent);
    if let Some(body) = body {
        event = event.with_request_body(body);
    }
    if let Some(headers) = headers {
        event = event.with_headers(headers);
    }

    tracing::debug!(
        method = %event.method,
        path = %event.path,
        status,
        response_time,
        "request captured"
    );
    capture.metrics.add(event);

    response
}

// ─── Helpers ─────────────────────────────────────────────────────

/// Repeated header names are joined with ", ".
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        map.entry(name.as_str().to_owned())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }
    map
}

/// Buffers a sized body so it can be both recorded and handed on.
/// Bodies without a `Content-Length`, empty ones, and ones above
/// `MAX_CAPTURED_BODY` are left untouched.
async fn buffer_body(req: Request) -> (Request, Option<serde_json::Value>) {
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    match declared {
        Some(len) if len > 0 && len <= MAX_CAPTURED_BODY => {}
        _ => return (req, None),
    }

    let (parts, body) = req.into_parts();
    match axum::body::to_bytes(body, MAX_CAPTURED_BODY).await {
        Ok(bytes) => {
            let value = body_value(&bytes);
            (Request::from_parts(parts, Body::from(bytes)), value)
        }
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), "could not buffer request body: {e}");
            (Request::from_parts(parts, Body::empty()), None)
        }
    }
}

/// JSON bodies are kept structured; other UTF-8 payloads as a string.
fn body_value(bytes: &[u8]) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok().or_else(|| {
        std::str::from_utf8(bytes)
            .ok()
            .map(|s| serde_json::Value::String(s.to_owned()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_value_prefers_json() {
        assert_eq!(
            body_value(br#"{"name":"a"}"#),
            Some(serde_json::json!({ "name": "a" }))
        );
        assert_eq!(
            body_value(b"name=a&email=b"),
            Some(serde_json::Value::String("name=a&email=b".into()))
        );
        assert_eq!(body_value(b""), None);
        assert_eq!(body_value(&[0xff, 0xfe]), None);
    }

    #[test]
    fn header_map_skips_opaque_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-plain", "yes".parse().unwrap());
        headers.insert(
            "x-binary",
            axum::http::HeaderValue::from_bytes(&[0xfa]).unwrap(),
        );

        let map = header_map(&headers);
        assert_eq!(map.get("x-plain").map(String::as_str), Some("yes"));
        assert!(!map.contains_key("x-binary"));
    }

    #[test]
    fn header_map_joins_repeated_names() {
        let mut headers = HeaderMap::new();
        headers.append("accept", "text/html".parse().unwrap());
        headers.append("accept", "application/json".parse().unwrap());
        headers.append("x-single", "1".parse().unwrap());

        let map = header_map(&headers);
        assert_eq!(
            map.get("accept").map(String::as_str),
            Some("text/html, application/json")
        );
        assert_eq!(map.get("x-single").map(String::as_str), Some("1"));
    }
}
