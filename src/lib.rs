//! Embeddable API monitoring for axum applications.
//!
//! A [`Monitor`] owns a bounded [`MetricsCollector`]. Wrap an application
//! router with [`Monitor::instrument`] to record one [`MetricEvent`] per
//! request, and call [`Monitor::start_dashboard`] to serve the metrics
//! query API.

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod monitor;
pub mod server;

pub use config::{CaptureOptions, MonitorConfig};
pub use error::{AppError, MonitorError, Result};
pub use metrics::{EndpointMetric, MetricEvent, MetricsCollector, PercentileSet, Summary};
pub use monitor::Monitor;
