use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;

use super::collector::DEFAULT_RECENT_LIMIT;
use super::{EndpointMetric, MetricEvent, MetricsCollector, PercentileSet, Summary};
use crate::error::AppError;
use crate::server::ShutdownSignal;

/// How often the SSE stream pushes a fresh snapshot.
const STREAM_INTERVAL: Duration = Duration::from_secs(1);

/// Everything the dashboard needs to redraw, shipped on every SSE tick.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub summary: Summary,
    pub endpoints: Vec<EndpointMetric>,
    pub recent: Vec<MetricEvent>,
}

impl DashboardSnapshot {
    pub fn capture(metrics: &MetricsCollector) -> Self {
        Self {
            summary: metrics.summary(),
            endpoints: metrics.by_endpoint(),
            recent: metrics.recent(DEFAULT_RECENT_LIMIT),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

// ─── GET /api/metrics/summary ────────────────────────────────────

pub async fn get_summary(
    State(metrics): State<Arc<MetricsCollector>>,
) -> Json<Summary> {
    Json(metrics.summary())
}

// ─── GET /api/metrics/endpoints ──────────────────────────────────

pub async fn get_endpoints(
    State(metrics): State<Arc<MetricsCollector>>,
) -> Json<Vec<EndpointMetric>> {
    Json(metrics.by_endpoint())
}

// ─── GET /api/metrics/recent?limit=N ─────────────────────────────
/// A missing, unparsable or zero `limit` falls back to 10.

pub async fn get_recent(
    State(metrics): State<Arc<MetricsCollector>>,
    Query(params): Query<RecentParams>,
) -> Json<Vec<MetricEvent>> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_RECENT_LIMIT);

    Json(metrics.recent(limit))
}

// ─── GET /api/metrics/all ────────────────────────────────────────

pub async fn get_all(
    State(metrics): State<Arc<MetricsCollector>>,
) -> Json<Vec<MetricEvent>> {
    Json(metrics.all())
}

// ─── GET /api/metrics/range?start=&end= ──────────────────────────

pub async fn get_range(
    State(metrics): State<Arc<MetricsCollector>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<MetricEvent>>, AppError> {
    let (Some(start), Some(end)) = (params.start, params.end) else {
        return Err(AppError::BadRequest(
            "start and end (ms since epoch) are required".into(),
        ));
    };
    if start > end {
        return Err(AppError::BadRequest("start must not be after end".into()));
    }

    Ok(Json(metrics.by_time_range(start, end)))
}

// ─── GET /api/metrics/count ──────────────────────────────────────

pub async fn get_count(
    State(metrics): State<Arc<MetricsCollector>>,
) -> Json<CountResponse> {
    Json(CountResponse {
        count: metrics.count(),
    })
}

// ─── GET /api/metrics/percentiles ────────────────────────────────

pub async fn get_percentiles(
    State(metrics): State<Arc<MetricsCollector>>,
) -> Json<PercentileSet> {
    Json(metrics.percentiles())
}

// ─── DELETE /api/metrics ─────────────────────────────────────────

pub async fn clear_metrics(
    State(metrics): State<Arc<MetricsCollector>>,
) -> StatusCode {
    let dropped = metrics.count();
    metrics.clear();
    tracing::info!(dropped, "metrics cleared");
    StatusCode::NO_CONTENT
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes a `DashboardSnapshot` as JSON every second, until the
/// dashboard shuts down.

pub async fn metrics_stream(
    State(metrics): State<Arc<MetricsCollector>>,
    State(shutdown): State<ShutdownSignal>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(STREAM_INTERVAL);

    let stream = IntervalStream::new(interval)
        .map(move |_| {
            let snapshot = DashboardSnapshot::capture(&metrics);
            let json = serde_json::to_string(&snapshot).unwrap_or_default();
            Ok(Event::default().data(json))
        })
        .take_until(shutdown.wait());

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
