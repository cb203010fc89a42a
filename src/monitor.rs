use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::{CaptureOptions, MonitorConfig};
use crate::error::{MonitorError, Result};
use crate::metrics::MetricsCollector;
use crate::server::ShutdownSignal;
use crate::{middleware, server};

/// How long `stop()` waits for open connections before aborting the server.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Owns one collector and the dashboard serving it.
///
/// Create one per application and hand it (or its `metrics()` handle) to
/// whatever needs to record or read requests.
pub struct Monitor {
    config: MonitorConfig,
    metrics: Arc<MetricsCollector>,
    dashboard: Mutex<Option<Dashboard>>,
}

/// A running dashboard server.
struct Dashboard {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<std::io::Result<()>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        let metrics = Arc::new(MetricsCollector::with_capacity(config.capacity));
        Self {
            config,
            metrics,
            dashboard: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Shared handle to the collector.
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Wraps an application router with the capture middleware.
    pub fn instrument<S>(&self, router: Router<S>, options: CaptureOptions) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        middleware::instrument(router, self.metrics.clone(), options)
    }

    /// The reporting router, for embedders that mount it themselves.
    pub fn dashboard_router(&self) -> Router {
        server::create_router(self.metrics.clone(), self.config.static_dir.as_deref())
    }

    /// Binds the dashboard listener and serves it on a background task.
    /// Returns the bound address; if already running, returns that one.
    pub async fn start_dashboard(&self) -> Result<SocketAddr> {
        let mut guard = self.dashboard.lock().await;
        if let Some(running) = guard.as_ref() {
            tracing::info!(addr = %running.addr, "dashboard already running");
            return Ok(running.addr);
        }

        if let Some(dir) = &self.config.static_dir {
            if !dir.is_dir() {
                return Err(MonitorError::Config(format!(
                    "static_dir {} is not a directory",
                    dir.display()
                )));
            }
        }

        let listener = tokio::net::TcpListener::bind(self.config.dashboard_addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown, signal) = watch::channel(false);
        let app = server::create_router_with_shutdown(
            self.metrics.clone(),
            self.config.static_dir.as_deref(),
            ShutdownSignal::new(signal.clone()),
        );

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(ShutdownSignal::new(signal).wait())
                .await
        });

        tracing::info!(%addr, capacity = self.metrics.capacity(), "dashboard started");
        *guard = Some(Dashboard {
            addr,
            shutdown,
            task,
        });
        Ok(addr)
    }

    /// Address of the running dashboard, if any.
    pub async fn dashboard_addr(&self) -> Option<SocketAddr> {
        self.dashboard.lock().await.as_ref().map(|d| d.addr)
    }

    /// Gracefully stops the dashboard: open streams are ended, and the
    /// server is aborted if connections are still open after
    /// `SHUTDOWN_GRACE`. No-op when it is not running.
    pub async fn stop(&self) -> Result<()> {
        let Some(dashboard) = self.dashboard.lock().await.take() else {
            return Ok(());
        };

        // The server may already have exited on its own
        let _ = dashboard.shutdown.send(true);
        let mut task = dashboard.task;
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(joined) => joined??,
            Err(_) => {
                tracing::warn!(addr = %dashboard.addr, "dashboard connections still open, aborting");
                task.abort();
            }
        }

        tracing::info!(addr = %dashboard.addr, "dashboard stopped");
        Ok(())
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
