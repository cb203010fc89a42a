use axum::{
    extract::FromRef,
    routing::{delete, get},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::metrics::{stream, MetricsCollector};

/// Resolves once the dashboard begins shutting down. Long-lived responses
/// (the SSE stream) end on it so graceful shutdown can complete.
#[derive(Clone, Default)]
pub struct ShutdownSignal(Option<watch::Receiver<bool>>);

impl ShutdownSignal {
    /// Fires when `true` is sent, or when the sender is dropped.
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self(Some(rx))
    }

    pub async fn wait(self) {
        match self.0 {
            Some(mut rx) => {
                let _ = rx.wait_for(|stopping| *stopping).await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// State shared by the dashboard routes.
#[derive(Clone)]
pub struct DashboardState {
    pub metrics: Arc<MetricsCollector>,
    pub shutdown: ShutdownSignal,
}

impl FromRef<DashboardState> for Arc<MetricsCollector> {
    fn from_ref(state: &DashboardState) -> Self {
        state.metrics.clone()
    }
}

impl FromRef<DashboardState> for ShutdownSignal {
    fn from_ref(state: &DashboardState) -> Self {
        state.shutdown.clone()
    }
}

/// Dashboard router whose stream never sees a shutdown; for embedders that
/// mount it inside their own server.
pub fn create_router(metrics: Arc<MetricsCollector>, static_dir: Option<&Path>) -> Router {
    create_router_with_shutdown(metrics, static_dir, ShutdownSignal::default())
}

/// Builds the dashboard `Router`: the metrics query surface, an optional
/// static directory for the frontend, and the global layers.
pub fn create_router_with_shutdown(
    metrics: Arc<MetricsCollector>,
    static_dir: Option<&Path>,
    shutdown: ShutdownSignal,
) -> Router {
    let router = Router::new()
        // ── Metrics queries ─────────────────────────────────────
        .route("/api/metrics/summary", get(stream::get_summary))
        .route("/api/metrics/endpoints", get(stream::get_endpoints))
        .route("/api/metrics/recent", get(stream::get_recent))
        .route("/api/metrics/all", get(stream::get_all))
        .route("/api/metrics/range", get(stream::get_range))
        .route("/api/metrics/count", get(stream::get_count))
        .route("/api/metrics/percentiles", get(stream::get_percentiles))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        // ── Administrative ──────────────────────────────────────
        .route("/api/metrics", delete(stream::clear_metrics))
        .with_state(DashboardState { metrics, shutdown });

    // ── Serve the frontend; unknown paths get index.html ────────
    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    // ── Global middleware (applied bottom-up) ───────────────────
    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
